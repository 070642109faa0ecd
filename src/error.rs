use rocket::{http::Status, response::Responder, serde::json::Json, Request};
use serde::Serialize;
use thiserror::Error;

use crate::model::errors::PollError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Poll(#[from] PollError),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Poll(err) => match err {
                PollError::InvalidPollConfig(_) | PollError::InvalidOption { .. } => {
                    Status::BadRequest
                }
                PollError::PollNotFound(_) => Status::NotFound,
                PollError::PollClosed(_) => Status::Forbidden,
                PollError::DuplicateVote { .. } => Status::Conflict,
            },
            Self::BadRequest(_) => Status::BadRequest,
            Self::NotFound(_) => Status::NotFound,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Poll(err) => err.kind(),
            Self::BadRequest(_) => "BadRequest",
            Self::NotFound(_) => "NotFound",
        }
    }
}

/// Body of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        debug!("Responding {status}: {self}");
        let body = ErrorBody {
            error: self.kind(),
            detail: self.to_string(),
        };
        (status, Json(body)).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::poll::PollId;

    #[test]
    fn poll_errors_map_to_distinct_statuses() {
        let id = PollId::new(1);
        let cases = [
            (PollError::InvalidPollConfig("x".into()), Status::BadRequest),
            (PollError::PollNotFound(id), Status::NotFound),
            (PollError::PollClosed(id), Status::Forbidden),
            (
                PollError::InvalidOption {
                    poll: id,
                    option: "C".into(),
                },
                Status::BadRequest,
            ),
            (PollError::DuplicateVote { poll: id, voter: 2 }, Status::Conflict),
        ];
        for (err, status) in cases {
            assert_eq!(Error::from(err).status(), status);
        }
    }
}
