//! The voting engine: creates polls, admits votes, closes polls at their vote
//! limit, and computes results.
//!
//! Every mutation of a poll happens under that poll's exclusive lock, in the
//! order: closed check, option check, ledger insert, tally increment, closure.
//! Reads take the shared lock and so always see a consistent tally.

use std::sync::Arc;

use crate::model::{
    errors::{EngineResult, PollError},
    ledger::VoterId,
    poll::{PollBounds, PollDetails, PollId, PollSpec, PollStatus},
    results::PollResult,
    tally::TallySnapshot,
};

mod registry;

pub use registry::{PollRecord, PollRegistry};

/// Outcome of an accepted vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteReceipt {
    /// The chosen option's count including this vote.
    pub count: u64,
    /// The poll's total including this vote.
    pub total: u64,
    /// `true` if this vote reached the limit and closed the poll.
    pub closed: bool,
}

/// Handle to the process-wide poll registry. Cheap to clone; all clones
/// share the same polls.
#[derive(Debug, Clone)]
pub struct PollEngine {
    registry: Arc<PollRegistry>,
}

impl PollEngine {
    pub fn new(bounds: PollBounds) -> Self {
        Self {
            registry: Arc::new(PollRegistry::new(bounds)),
        }
    }

    #[cfg(test)]
    pub fn registry(&self) -> &PollRegistry {
        &self.registry
    }

    pub fn create_poll(&self, spec: PollSpec) -> EngineResult<PollId> {
        self.registry.create(spec)
    }

    /// Cast `voter`'s vote for `option` on poll `id`.
    ///
    /// Either the vote is fully counted or nothing changes.
    pub fn cast_vote(&self, id: PollId, voter: VoterId, option: &str) -> EngineResult<VoteReceipt> {
        let record = self.registry.get(id)?;
        let config = record.config();

        let mut state = record.write();
        if state.status.is_closed() {
            debug!("Rejected vote by {voter} on closed poll {id}");
            return Err(PollError::PollClosed(id));
        }
        let index = config.option_index(option).ok_or_else(|| {
            debug!("Rejected vote by {voter} on poll {id}: unknown option '{option}'");
            PollError::InvalidOption {
                poll: id,
                option: option.to_string(),
            }
        })?;
        if !state.ledger.record_vote(voter) {
            debug!("Rejected repeat vote by {voter} on poll {id}");
            return Err(PollError::DuplicateVote { poll: id, voter });
        }

        let (count, total) = state.tally.increment(index);
        let closed = total >= config.limit();
        if closed {
            state.status = PollStatus::Closed;
        }
        drop(state);

        debug!("Accepted vote by {voter} on poll {id} for '{option}' ({total}/{})", config.limit());
        if closed {
            info!("Poll {id} reached its limit of {} votes and is now closed", config.limit());
        }
        Ok(VoteReceipt {
            count,
            total,
            closed,
        })
    }

    pub fn poll_details(&self, id: PollId) -> EngineResult<PollDetails> {
        Ok(self.registry.get(id)?.details())
    }

    /// Current per-option counts. Available whether or not the poll is closed.
    pub fn live_count(&self, id: PollId) -> EngineResult<TallySnapshot> {
        let record = self.registry.get(id)?;
        let snapshot = record.read().tally.snapshot(record.config().options());
        Ok(snapshot)
    }

    /// Whether the poll has closed.
    pub fn status(&self, id: PollId) -> EngineResult<bool> {
        Ok(self.registry.get(id)?.status().is_closed())
    }

    /// The leading option(s), or nothing if no votes have been cast.
    pub fn result(&self, id: PollId) -> EngineResult<PollResult> {
        let snapshot = self.live_count(id)?;
        Ok(PollResult::from_snapshot(&snapshot))
    }

    pub fn has_voted(&self, id: PollId, voter: VoterId) -> EngineResult<bool> {
        Ok(self.registry.get(id)?.read().ledger.has_voted(voter))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use indexmap::IndexMap;

    use super::*;

    fn engine() -> PollEngine {
        log4rs_test_utils::test_logging::init_logging_once_for(["castvote_backend"], None, None);
        PollEngine::new(PollBounds::default())
    }

    fn counts(pairs: &[(&str, u64)]) -> IndexMap<String, u64> {
        pairs.iter().map(|(o, c)| (o.to_string(), *c)).collect()
    }

    #[test]
    fn full_poll_lifecycle() {
        let engine = engine();
        let id = engine.create_poll(PollSpec::example()).unwrap();
        assert!(!engine.status(id).unwrap());
        assert!(engine.result(id).unwrap().is_empty());

        let receipt = engine.cast_vote(id, 1, "A").unwrap();
        assert_eq!(receipt, VoteReceipt { count: 1, total: 1, closed: false });
        let receipt = engine.cast_vote(id, 2, "A").unwrap();
        assert_eq!(receipt, VoteReceipt { count: 2, total: 2, closed: false });
        let receipt = engine.cast_vote(id, 3, "B").unwrap();
        assert_eq!(receipt, VoteReceipt { count: 1, total: 3, closed: true });

        let details = engine.poll_details(id).unwrap();
        assert_eq!(details.total_votes, 3);
        assert_eq!(details.status, PollStatus::Closed);
        assert!(engine.status(id).unwrap());

        let live = engine.live_count(id).unwrap();
        assert_eq!(live.counts, counts(&[("A", 2), ("B", 1)]));
        assert_eq!(live.total, 3);
        assert_eq!(engine.result(id).unwrap().into_inner(), counts(&[("A", 2)]));
    }

    #[test]
    fn closed_poll_rejects_votes() {
        let engine = engine();
        let id = engine.create_poll(PollSpec::example()).unwrap();
        for (voter, option) in [(1, "A"), (2, "A"), (3, "B")] {
            engine.cast_vote(id, voter, option).unwrap();
        }
        let before = engine.live_count(id).unwrap();

        // Closure takes precedence over every other rejection reason.
        assert_eq!(engine.cast_vote(id, 1, "B"), Err(PollError::PollClosed(id)));
        assert_eq!(engine.cast_vote(id, 4, "A"), Err(PollError::PollClosed(id)));
        assert_eq!(engine.cast_vote(id, 5, "C"), Err(PollError::PollClosed(id)));

        assert_eq!(engine.live_count(id).unwrap(), before);
        assert!(!engine.has_voted(id, 4).unwrap());
    }

    #[test]
    fn unknown_option_is_rejected() {
        let engine = engine();
        let id = engine.create_poll(PollSpec::example()).unwrap();
        engine.cast_vote(id, 1, "A").unwrap();

        assert_eq!(
            engine.cast_vote(id, 4, "C"),
            Err(PollError::InvalidOption {
                poll: id,
                option: "C".to_string()
            })
        );
        // A rejected vote leaves the voter free to vote properly.
        assert!(!engine.has_voted(id, 4).unwrap());
        assert_eq!(engine.live_count(id).unwrap().total, 1);
        engine.cast_vote(id, 4, "B").unwrap();
    }

    #[test]
    fn repeat_vote_is_rejected() {
        let engine = engine();
        let id = engine.create_poll(PollSpec::example()).unwrap();
        engine.cast_vote(id, 1, "A").unwrap();
        engine.cast_vote(id, 2, "A").unwrap();

        assert_eq!(
            engine.cast_vote(id, 2, "B"),
            Err(PollError::DuplicateVote { poll: id, voter: 2 })
        );
        let live = engine.live_count(id).unwrap();
        assert_eq!(live.counts, counts(&[("A", 2), ("B", 0)]));
        assert!(!engine.status(id).unwrap());
    }

    #[test]
    fn voters_are_scoped_per_poll() {
        let engine = engine();
        let first = engine.create_poll(PollSpec::example()).unwrap();
        let second = engine.create_poll(PollSpec::example()).unwrap();
        assert_ne!(first, second);

        engine.cast_vote(first, 1, "A").unwrap();
        engine.cast_vote(second, 1, "B").unwrap();
        assert!(engine.has_voted(first, 1).unwrap());
        assert!(engine.has_voted(second, 1).unwrap());
    }

    #[test]
    fn labels_match_exactly_as_created() {
        let engine = engine();
        let id = engine
            .create_poll(PollSpec::example_with(&["A", "A ", "B"], 10))
            .unwrap();
        assert_eq!(engine.poll_details(id).unwrap().options, vec!["A", "A ", "B"]);

        assert_eq!(engine.cast_vote(id, 1, "A ").unwrap().count, 1);
        assert_eq!(engine.cast_vote(id, 2, "A").unwrap().count, 1);
        assert!(matches!(
            engine.cast_vote(id, 3, " B"),
            Err(PollError::InvalidOption { .. })
        ));
        assert_eq!(
            engine.live_count(id).unwrap().counts,
            counts(&[("A", 1), ("A ", 1), ("B", 0)])
        );
    }

    #[test]
    fn unknown_poll_is_not_found() {
        let engine = engine();
        let id = PollId::new(42);
        let not_found = Err(PollError::PollNotFound(id));
        assert_eq!(engine.cast_vote(id, 1, "A").map(|_| ()), not_found);
        assert_eq!(engine.poll_details(id).map(|_| ()), not_found);
        assert_eq!(engine.live_count(id).map(|_| ()), not_found);
        assert_eq!(engine.status(id).map(|_| ()), not_found);
        assert_eq!(engine.result(id).map(|_| ()), not_found);
        assert_eq!(engine.has_voted(id, 1).map(|_| ()), not_found);
    }

    #[test]
    fn tie_reports_all_leaders() {
        let engine = engine();
        let id = engine
            .create_poll(PollSpec::example_with(&["A", "B", "C"], 10))
            .unwrap();
        engine.cast_vote(id, 1, "A").unwrap();
        engine.cast_vote(id, 2, "C").unwrap();
        engine.cast_vote(id, 3, "B").unwrap();
        engine.cast_vote(id, 4, "C").unwrap();
        engine.cast_vote(id, 5, "A").unwrap();

        let result = engine.result(id).unwrap();
        assert!(result.is_tie());
        assert_eq!(result.into_inner(), counts(&[("A", 2), ("C", 2)]));
    }

    #[test]
    fn limit_of_one_closes_immediately() {
        let engine = engine();
        let id = engine.create_poll(PollSpec::example_with(&["A", "B"], 1)).unwrap();
        assert!(engine.cast_vote(id, 7, "B").unwrap().closed);
        assert_eq!(engine.cast_vote(id, 8, "A"), Err(PollError::PollClosed(id)));
    }

    #[test]
    fn concurrent_repeat_votes_count_once() {
        const THREADS: usize = 16;

        let engine = engine();
        let id = engine
            .create_poll(PollSpec::example_with(&["A", "B"], 100))
            .unwrap();
        let accepted = AtomicUsize::new(0);
        let duplicates = AtomicUsize::new(0);

        thread::scope(|s| {
            for i in 0..THREADS {
                let (engine, accepted, duplicates) = (&engine, &accepted, &duplicates);
                s.spawn(move || {
                    let option = if i % 2 == 0 { "A" } else { "B" };
                    match engine.cast_vote(id, 1, option) {
                        Ok(_) => accepted.fetch_add(1, Ordering::SeqCst),
                        Err(PollError::DuplicateVote { .. }) => {
                            duplicates.fetch_add(1, Ordering::SeqCst)
                        }
                        Err(e) => panic!("unexpected error: {e}"),
                    };
                });
            }
        });

        assert_eq!(accepted.load(Ordering::SeqCst), 1);
        assert_eq!(duplicates.load(Ordering::SeqCst), THREADS - 1);
        assert_eq!(engine.live_count(id).unwrap().total, 1);
    }

    #[test]
    fn concurrent_votes_never_exceed_limit() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 50;
        const LIMIT: u64 = 137;

        let engine = engine();
        let id = engine
            .create_poll(PollSpec::example_with(&["A", "B", "C"], LIMIT as i64))
            .unwrap();
        let options = ["A", "B", "C"];

        let (accepted, closers) = thread::scope(|s| {
            let handles = (0..THREADS)
                .map(|t| {
                    let engine = &engine;
                    s.spawn(move || {
                        let mut accepted = Vec::new();
                        let mut closers = 0;
                        for n in 0..PER_THREAD {
                            let voter = t * PER_THREAD + n;
                            let option = options[(voter % 3) as usize];
                            match engine.cast_vote(id, voter, option) {
                                Ok(receipt) => {
                                    accepted.push(voter);
                                    if receipt.closed {
                                        closers += 1;
                                    }
                                }
                                Err(PollError::PollClosed(_)) => {}
                                Err(e) => panic!("unexpected error: {e}"),
                            }
                        }
                        (accepted, closers)
                    })
                })
                .collect::<Vec<_>>();
            handles.into_iter().map(|h| h.join().unwrap()).fold(
                (HashSet::new(), 0),
                |(mut all, total_closers), (accepted, closers)| {
                    all.extend(accepted);
                    (all, total_closers + closers)
                },
            )
        });

        assert_eq!(accepted.len() as u64, LIMIT);
        assert_eq!(closers, 1);
        assert!(engine.status(id).unwrap());

        let live = engine.live_count(id).unwrap();
        assert_eq!(live.total, LIMIT);
        assert_eq!(live.counts.values().sum::<u64>(), LIMIT);
        for voter in accepted {
            assert!(engine.has_voted(id, voter).unwrap());
        }
    }

    #[test]
    fn reads_stay_consistent_during_voting() {
        const VOTERS: u64 = 400;

        let engine = engine();
        let id = engine
            .create_poll(PollSpec::example_with(&["A", "B"], VOTERS as i64))
            .unwrap();

        thread::scope(|s| {
            let writer_engine = &engine;
            s.spawn(move || {
                for voter in 0..VOTERS {
                    let option = if voter % 3 == 0 { "A" } else { "B" };
                    writer_engine.cast_vote(id, voter, option).unwrap();
                }
            });
            let reader_engine = &engine;
            s.spawn(move || loop {
                let live = reader_engine.live_count(id).unwrap();
                assert_eq!(live.counts.values().sum::<u64>(), live.total);
                assert!(live.total <= VOTERS);
                if live.total == VOTERS {
                    break;
                }
            });
        });

        assert!(engine.status(id).unwrap());
    }
}
