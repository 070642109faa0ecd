use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Running vote counts for one poll, indexed by option position.
///
/// Invariant: `total` is always the sum of `counts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    counts: Vec<u64>,
    total: u64,
}

impl Tally {
    /// Create zero-counts for a poll with `options` options.
    pub fn new(options: usize) -> Self {
        Self {
            counts: vec![0; options],
            total: 0,
        }
    }

    /// Add one vote to the option at `index`.
    /// Returns the option's new count and the poll's new total.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range; callers resolve the index from the
    /// poll's own option set.
    pub fn increment(&mut self, index: usize) -> (u64, u64) {
        let count = &mut self.counts[index];
        *count += 1;
        self.total += 1;
        (*count, self.total)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Pair each count with its option label.
    pub fn snapshot(&self, options: &IndexSet<String>) -> TallySnapshot {
        let counts = options
            .iter()
            .zip(&self.counts)
            .map(|(option, count)| (option.clone(), *count))
            .collect();
        TallySnapshot {
            counts,
            total: self.total,
        }
    }
}

/// A point-in-time copy of a poll's tally, in the poll's option order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallySnapshot {
    pub counts: IndexMap<String, u64>,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(labels: &[&str]) -> IndexSet<String> {
        labels.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn increment_tracks_total() {
        let mut tally = Tally::new(3);
        assert_eq!(tally.increment(0), (1, 1));
        assert_eq!(tally.increment(2), (1, 2));
        assert_eq!(tally.increment(0), (2, 3));
        assert_eq!(tally.total(), 3);
        assert_eq!(tally.counts, vec![2, 0, 1]);
    }

    #[test]
    fn snapshot_is_consistent() {
        let mut tally = Tally::new(2);
        tally.increment(1);
        tally.increment(1);
        tally.increment(0);

        let snapshot = tally.snapshot(&options(&["Yes", "No"]));
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.counts.values().sum::<u64>(), snapshot.total);
        let pairs = snapshot.counts.into_iter().collect::<Vec<_>>();
        assert_eq!(pairs, vec![("Yes".to_string(), 1), ("No".to_string(), 2)]);
    }
}
