//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{QuizId, ResultSummaryError};
use storage::repository::StorageError;

use crate::sessions::{Operation, SessionState};

/// Errors emitted by `QuizSession` transitions.
///
/// None of these change session state: a rejected call leaves the session
/// exactly as it was.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("cannot {operation} while session is {state}")]
    InvalidTransition {
        operation: Operation,
        state: SessionState,
    },
    #[error("question {index} has already been answered")]
    AlreadyAnswered { index: usize },
    #[error("option {option} is out of range for {len} options")]
    OptionOutOfRange { option: usize, len: usize },
    #[error(transparent)]
    Summary(#[from] ResultSummaryError),
}

/// Errors emitted by a `QuestionSource`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    #[error("question source unavailable: {0}")]
    Unavailable(String),
    #[error("question generator is not configured")]
    Disabled,
    #[error("criteria do not name a quiz")]
    MissingQuizId,
    #[error("quiz {0} not found")]
    NotFound(QuizId),
    #[error("question source returned unusable data: {0}")]
    Malformed(String),
    #[error("question generator request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SourceError {
    /// Whether showing a retry affordance makes sense.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Unavailable(_) | SourceError::Http(_) | SourceError::Malformed(_) => true,
            SourceError::HttpStatus(status) => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            SourceError::Storage(err) => matches!(err, StorageError::Connection(_)),
            SourceError::Disabled | SourceError::MissingQuizId | SourceError::NotFound(_) => false,
        }
    }
}

/// Errors emitted by a `ResultSink`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SinkError {
    #[error("result rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizLoopService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizLoopError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Errors emitted by `QuizHistoryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
