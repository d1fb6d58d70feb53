use std::sync::Arc;

use quiz_core::model::{QuizLaunch, QuizSession};
use storage::repository::{SnapshotRepository, StorageError};
use tracing::{info, warn};

use crate::backend::{QuestionQuery, QuizBackend};
use crate::error::QuizError;

/// A session ready to run, plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSession {
    pub session: QuizSession,
    pub launch: QuizLaunch,
    pub resumed: bool,
}

/// Establishes the session for a launch: resume from the durable snapshot or
/// fetch a fresh batch.
#[derive(Clone)]
pub struct SessionLoader {
    backend: Arc<dyn QuizBackend>,
    snapshots: Arc<dyn SnapshotRepository>,
}

impl SessionLoader {
    #[must_use]
    pub fn new(backend: Arc<dyn QuizBackend>, snapshots: Arc<dyn SnapshotRepository>) -> Self {
        Self { backend, snapshots }
    }

    /// Resume or start the session for `launch`.
    ///
    /// A readable, consistent snapshot is restored verbatim without contacting
    /// the backend. A corrupt one is discarded and a fresh batch is fetched.
    /// Nothing is written to the snapshot slot here.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestions` for an empty batch, `QuizError::Load`
    /// when the fetch fails, or `QuizError::Storage` if the slot is unreachable.
    pub async fn load(&self, launch: QuizLaunch) -> Result<LoadedSession, QuizError> {
        if let Some(session) = self.try_resume(&launch).await? {
            info!(
                key = %launch.key,
                index = session.current_index(),
                time_left = session.time_left(),
                "resuming quiz from snapshot"
            );
            return Ok(LoadedSession {
                session,
                launch,
                resumed: true,
            });
        }

        let mut questions = self
            .backend
            .fetch_questions(&QuestionQuery::from(&launch))
            .await
            .map_err(QuizError::Load)?;
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        if launch.limit > 0 {
            questions.truncate(usize::try_from(launch.limit).unwrap_or(usize::MAX));
        }

        let session = QuizSession::start(&launch, questions)?;
        info!(
            key = %launch.key,
            questions = session.questions().len(),
            duration_secs = session.total_duration_secs(),
            "starting fresh quiz"
        );
        Ok(LoadedSession {
            session,
            launch,
            resumed: false,
        })
    }

    async fn try_resume(&self, launch: &QuizLaunch) -> Result<Option<QuizSession>, QuizError> {
        let snapshot = match self.snapshots.load_snapshot(&launch.key).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return Ok(None),
            Err(StorageError::Serialization(reason)) => {
                warn!(key = %launch.key, %reason, "discarding unreadable quiz snapshot");
                self.discard(launch).await?;
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        match QuizSession::restore(launch, snapshot) {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                warn!(key = %launch.key, error = %err, "discarding inconsistent quiz snapshot");
                self.discard(launch).await?;
                Ok(None)
            }
        }
    }

    async fn discard(&self, launch: &QuizLaunch) -> Result<(), QuizError> {
        self.snapshots.delete_snapshot(&launch.key).await?;
        Ok(())
    }
}
