use std::collections::HashSet;

/// Opaque voter identifier supplied by the caller. Not authenticated.
pub type VoterId = u64;

/// The set of voters who have successfully voted on one poll.
///
/// Membership is permanent. The ledger is owned by its poll's state and only
/// reached through the poll's write lock, so `record_vote` is a single
/// check-and-insert step that no concurrent caller can interleave with.
#[derive(Debug, Default, Clone)]
pub struct VoteLedger {
    voters: HashSet<VoterId>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_voted(&self, voter: VoterId) -> bool {
        self.voters.contains(&voter)
    }

    /// Record `voter` as having voted.
    /// Returns `true` if this call inserted them, `false` (and changes
    /// nothing) if they were already present.
    pub fn record_vote(&mut self, voter: VoterId) -> bool {
        self.voters.insert(voter)
    }
}
