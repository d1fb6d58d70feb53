//! Shared error types for the services crate.

use chrono::{DateTime, Utc};
use thiserror::Error;

use quiz_core::model::{AttemptId, SessionError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `QuizBackend` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("backend request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("backend request timed out")]
    Timeout,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by the quiz session flow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("no questions found for this category/difficulty")]
    NoQuestions,
    #[error("failed to load questions: {0}")]
    Load(#[source] BackendError),
    #[error("failed to submit quiz: {0}")]
    Submission(#[source] BackendError),
    #[error("quiz left before submission")]
    Abandoned,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl QuizError {
    /// Whether the session is still alive and the action can be tried again.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, QuizError::Submission(_) | QuizError::Storage(_))
    }
}

/// Reasons a contest or practice entry is refused.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EntryError {
    #[error("contest already completed")]
    AlreadyCompleted { attempt_id: Option<AttemptId> },
    #[error("contest starts at {starts_at}")]
    NotStarted { starts_at: DateTime<Utc> },
    #[error("contest has ended")]
    Ended,
    #[error("location is required to join this contest")]
    LocationRequired,
    #[error("you are {distance_m:.0}m away from the venue (max {radius_m:.0}m)")]
    TooFar { distance_m: f64, radius_m: f64 },
    #[error("an access code is required")]
    AccessCodeRequired,
    #[error("incorrect access code")]
    AccessDenied,
    #[error(transparent)]
    Verifier(#[from] BackendError),
}

/// Errors emitted while bootstrapping services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
