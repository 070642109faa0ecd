//! Request and response bodies of the HTTP API.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{
    ledger::VoterId,
    poll::{PollDetails, PollId},
    results::PollResult,
    tally::TallySnapshot,
};

/// Response to poll creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPollOutput {
    pub id: PollId,
}

/// API-friendly representation of a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollDescription {
    pub name: String,
    pub options: Vec<String>,
    pub limit: u64,
    /// Number of votes cast so far.
    pub count: u64,
    pub closed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<PollDetails> for PollDescription {
    fn from(details: PollDetails) -> Self {
        Self {
            name: details.name,
            options: details.options,
            limit: details.limit,
            count: details.total_votes,
            closed: details.status.is_closed(),
            created_at: details.created_at,
        }
    }
}

/// Per-option vote counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveCountOutput {
    pub livedata: IndexMap<String, u64>,
}

impl From<TallySnapshot> for LiveCountOutput {
    fn from(snapshot: TallySnapshot) -> Self {
        Self {
            livedata: snapshot.counts,
        }
    }
}

/// A vote a voter wishes to cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastVoteInput {
    /// Identifies the voter casting this vote.
    pub id: VoterId,
    pub option: String,
}

/// Response to an accepted vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastVoteOutput {
    /// Always `true`; rejected votes produce an error response instead.
    pub status: bool,
    /// The chosen option's new count.
    pub count: u64,
    /// Whether the poll is now closed.
    pub closed: bool,
}

/// A single boolean flag, e.g. whether a poll is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusOutput {
    pub status: bool,
}

/// The leading option(s) of a poll; empty if nobody has voted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResultOutput {
    pub result: IndexMap<String, u64>,
}

impl From<PollResult> for PollResultOutput {
    fn from(result: PollResult) -> Self {
        Self {
            result: result.into_inner(),
        }
    }
}

/// Service identification returned from the index route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
}
