use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::model::{
    errors::{EngineResult, PollError},
    ledger::VoteLedger,
    poll::{PollBounds, PollConfig, PollDetails, PollId, PollSpec, PollStatus},
    tally::Tally,
};

/// The mutable part of a poll. Guarded as a unit, so the ledger, tally, and
/// status of one poll always change together.
#[derive(Debug)]
pub(crate) struct PollState {
    pub status: PollStatus,
    pub ledger: VoteLedger,
    pub tally: Tally,
}

/// A single poll: immutable configuration plus lockable state.
#[derive(Debug)]
pub struct PollRecord {
    id: PollId,
    config: PollConfig,
    created_at: DateTime<Utc>,
    state: RwLock<PollState>,
}

impl PollRecord {
    fn new(id: PollId, config: PollConfig) -> Self {
        let tally = Tally::new(config.options().len());
        Self {
            id,
            config,
            created_at: Utc::now(),
            state: RwLock::new(PollState {
                status: PollStatus::Active,
                ledger: VoteLedger::new(),
                tally,
            }),
        }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    pub fn status(&self) -> PollStatus {
        self.read().status
    }

    /// Describe this poll as of now.
    pub fn details(&self) -> PollDetails {
        let state = self.read();
        PollDetails {
            id: self.id,
            name: self.config.name().to_string(),
            options: self.config.options().iter().cloned().collect(),
            limit: self.config.limit(),
            total_votes: state.tally.total(),
            status: state.status,
            created_at: self.created_at,
        }
    }

    /// Shared access for reads. Any number of readers may hold this at once.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, PollState> {
        self.state.read()
    }

    /// Exclusive access for votes. Serialises every mutation of this poll.
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, PollState> {
        self.state.write()
    }
}

/// Owns every poll for the lifetime of the process and hands out new IDs.
///
/// The map lock is only held to insert or look up a record; all per-poll work
/// happens on the record's own lock, so polls never contend with each other.
#[derive(Debug)]
pub struct PollRegistry {
    polls: RwLock<HashMap<PollId, Arc<PollRecord>>>,
    next_id: AtomicU64,
    bounds: PollBounds,
}

impl PollRegistry {
    pub fn new(bounds: PollBounds) -> Self {
        Self {
            polls: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            bounds,
        }
    }

    /// Validate `spec` and store a new, active poll with zeroed counts.
    pub fn create(&self, spec: PollSpec) -> EngineResult<PollId> {
        let config = spec.validate(&self.bounds)?;
        let id = self.allocate_id();
        info!(
            "Created poll {id} '{}' with {} options and a limit of {}",
            config.name(),
            config.options().len(),
            config.limit()
        );
        let record = Arc::new(PollRecord::new(id, config));
        self.polls.write().insert(id, record);
        Ok(id)
    }

    pub fn get(&self, id: PollId) -> EngineResult<Arc<PollRecord>> {
        self.polls
            .read()
            .get(&id)
            .cloned()
            .ok_or(PollError::PollNotFound(id))
    }

    /// Number of polls held.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.polls.read().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Atomically retrieve the next ID. IDs are never handed out twice.
    fn allocate_id(&self) -> PollId {
        PollId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}
