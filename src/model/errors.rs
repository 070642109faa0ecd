use thiserror::Error;

use crate::model::{ledger::VoterId, poll::PollId};

pub type EngineResult<T> = std::result::Result<T, PollError>;

/// Every way a poll operation can be refused.
///
/// Each of these is detected before anything is mutated, so an `Err` always
/// means the call had no effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("Invalid poll configuration: {0}")]
    InvalidPollConfig(String),
    #[error("Poll '{0}' not found")]
    PollNotFound(PollId),
    #[error("Poll '{0}' is closed and no longer accepting votes")]
    PollClosed(PollId),
    #[error("Option '{option}' is not part of poll '{poll}'")]
    InvalidOption { poll: PollId, option: String },
    #[error("Voter '{voter}' has already voted on poll '{poll}'")]
    DuplicateVote { poll: PollId, voter: VoterId },
}

impl PollError {
    /// A short, stable name for this kind of error, suitable for API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPollConfig(_) => "InvalidPollConfig",
            Self::PollNotFound(_) => "PollNotFound",
            Self::PollClosed(_) => "PollClosed",
            Self::InvalidOption { .. } => "InvalidOption",
            Self::DuplicateVote { .. } => "DuplicateVote",
        }
    }

    pub(crate) fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidPollConfig(msg.into())
    }
}
