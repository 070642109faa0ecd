use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::tally::TallySnapshot;

/// The leading option(s) of a poll.
///
/// Every option sharing the maximum count is included, so a tie is reported
/// as a tie rather than an arbitrary winner. Empty while no votes have been
/// cast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollResult {
    leaders: IndexMap<String, u64>,
}

impl PollResult {
    pub fn from_snapshot(snapshot: &TallySnapshot) -> Self {
        if snapshot.total == 0 {
            return Self::default();
        }
        let max = snapshot.counts.values().copied().max().unwrap_or(0);
        let leaders = snapshot
            .counts
            .iter()
            .filter(|(_, count)| **count == max)
            .map(|(option, count)| (option.clone(), *count))
            .collect();
        Self { leaders }
    }

    #[cfg(test)]
    pub fn is_tie(&self) -> bool {
        self.leaders.len() > 1
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.leaders.is_empty()
    }

    /// The leading options and their (equal) counts, in poll option order.
    pub fn into_inner(self) -> IndexMap<String, u64> {
        self.leaders
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(counts: &[(&str, u64)]) -> TallySnapshot {
        TallySnapshot {
            counts: counts.iter().map(|(o, c)| (o.to_string(), *c)).collect(),
            total: counts.iter().map(|(_, c)| c).sum(),
        }
    }

    #[test]
    fn no_votes_means_no_result() {
        let result = PollResult::from_snapshot(&snapshot(&[("A", 0), ("B", 0)]));
        assert!(result.is_empty());
        assert!(!result.is_tie());
    }

    #[test]
    fn single_leader() {
        let result = PollResult::from_snapshot(&snapshot(&[("A", 2), ("B", 1)]));
        assert_eq!(
            result.into_inner(),
            IndexMap::from([("A".to_string(), 2)])
        );
    }

    #[test]
    fn tie_reports_every_leader() {
        let result = PollResult::from_snapshot(&snapshot(&[("A", 3), ("B", 1), ("C", 3)]));
        assert!(result.is_tie());
        let leaders = result.leaders.iter().collect::<Vec<_>>();
        assert_eq!(leaders, vec![(&"A".to_string(), &3), (&"C".to_string(), &3)]);
    }
}
