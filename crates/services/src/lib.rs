#![forbid(unsafe_code)]

pub mod backend;
pub mod config;
pub mod entry;
pub mod error;
pub mod quiz_services;
pub mod sessions;

pub use quiz_core::Clock;

pub use backend::{HttpQuizBackend, QuestionQuery, QuizBackend, SubmitRequest};
pub use entry::{AccessTarget, AccessVerifier, ContestGate, StaticAccessVerifier};
pub use error::{BackendError, EntryError, QuizError, QuizServicesError};
pub use quiz_services::QuizServices;
pub use sessions::{
    LoadedSession, QuizCommand, QuizDriver, QuizEvent, QuizRunner, QuizView, SessionLoader,
};
