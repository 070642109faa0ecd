use std::fmt::{Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use rocket::form::{self, error::ErrorKind, FromFormField, ValueField};
use serde::{Deserialize, Serialize};

use crate::model::errors::{EngineResult, PollError};

/// A poll's unique identifier. Allocated by the registry, never reused.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollId(u64);

impl PollId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for PollId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PollId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

#[rocket::async_trait]
impl<'r> FromFormField<'r> for PollId {
    fn from_value(field: ValueField<'r>) -> form::Result<'r, Self> {
        field
            .value
            .parse::<PollId>()
            .map_err(|err| ErrorKind::Int(err).into())
    }
}

/// States in the poll lifecycle. The only transition is `Active -> Closed`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollStatus {
    /// Accepting votes.
    Active,
    /// The vote limit has been reached. Final.
    Closed,
}

impl PollStatus {
    pub fn is_closed(self) -> bool {
        self == Self::Closed
    }
}

/// Upper bounds applied to new polls on top of the structural checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBounds {
    /// Maximum number of options a poll may have.
    pub max_options: usize,
    /// Maximum vote limit a poll may be created with.
    pub max_vote_limit: u64,
    /// Maximum length in characters of a poll name or option label.
    pub max_name_length: usize,
}

impl Default for PollBounds {
    fn default() -> Self {
        Self {
            max_options: 64,
            max_vote_limit: 1_000_000,
            max_name_length: 256,
        }
    }
}

/// A poll specification, as submitted by a caller. Not yet validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSpec {
    /// Poll name.
    pub name: String,
    /// Possible answers, in display order.
    pub options: Vec<String>,
    /// Total number of votes after which the poll closes.
    /// Signed so that a negative limit that still fits in an `i64` is reported
    /// as a bad configuration rather than a malformed request.
    pub limit: i64,
}

impl PollSpec {
    /// Check this spec against the structural rules and the given bounds,
    /// producing the immutable configuration for a new poll.
    pub fn validate(self, bounds: &PollBounds) -> EngineResult<PollConfig> {
        if self.name.chars().count() > bounds.max_name_length {
            return Err(PollError::invalid_config(format!(
                "poll name exceeds {} characters",
                bounds.max_name_length
            )));
        }

        if self.options.len() < 2 {
            return Err(PollError::invalid_config(format!(
                "a poll needs at least 2 options, got {}",
                self.options.len()
            )));
        }
        if self.options.len() > bounds.max_options {
            return Err(PollError::invalid_config(format!(
                "a poll may have at most {} options, got {}",
                bounds.max_options,
                self.options.len()
            )));
        }

        let mut options = IndexSet::with_capacity(self.options.len());
        for label in self.options {
            if label.trim().is_empty() {
                return Err(PollError::invalid_config("option labels must not be blank"));
            }
            if label.chars().count() > bounds.max_name_length {
                return Err(PollError::invalid_config(format!(
                    "option '{label}' exceeds {} characters",
                    bounds.max_name_length
                )));
            }
            if options.contains(&label) {
                return Err(PollError::invalid_config(format!(
                    "option '{label}' appears more than once"
                )));
            }
            options.insert(label);
        }

        let limit = match u64::try_from(self.limit) {
            Ok(limit) if limit >= 1 => limit,
            _ => {
                return Err(PollError::invalid_config(format!(
                    "vote limit must be positive, got {}",
                    self.limit
                )))
            }
        };
        if limit > bounds.max_vote_limit {
            return Err(PollError::invalid_config(format!(
                "vote limit may be at most {}, got {limit}",
                bounds.max_vote_limit
            )));
        }

        Ok(PollConfig {
            name: self.name,
            options,
            limit,
        })
    }
}

/// The validated, immutable configuration of a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    name: String,
    options: IndexSet<String>,
    limit: u64,
}

impl PollConfig {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Option labels in their configured order.
    pub fn options(&self) -> &IndexSet<String> {
        &self.options
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Position of the given option label, if it belongs to this poll.
    pub fn option_index(&self, option: &str) -> Option<usize> {
        self.options.get_index_of(option)
    }
}

/// A read-only view of a poll's configuration and progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollDetails {
    pub id: PollId,
    pub name: String,
    pub options: Vec<String>,
    pub limit: u64,
    pub total_votes: u64,
    pub status: PollStatus,
    pub created_at: DateTime<Utc>,
}
