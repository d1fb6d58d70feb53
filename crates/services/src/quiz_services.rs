use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{AttemptId, ClientSettings, QuizLaunch, QuizResult};
use storage::repository::{SnapshotRepository, Storage};
use tracing::info;

use crate::Clock;
use crate::backend::{HttpQuizBackend, QuizBackend};
use crate::entry::{ContestGate, StaticAccessVerifier};
use crate::error::{BackendError, QuizError, QuizServicesError};
use crate::sessions::{QuizDriver, QuizRunner, SessionLoader};

/// Assembles the quiz flow around one backend and one snapshot store.
#[derive(Clone)]
pub struct QuizServices {
    backend: Arc<dyn QuizBackend>,
    snapshots: Arc<dyn SnapshotRepository>,
    loader: SessionLoader,
    gate: Arc<ContestGate>,
    submit_timeout: Duration,
}

impl QuizServices {
    /// Build services backed by `SQLite` storage and the HTTP backend.
    ///
    /// # Errors
    ///
    /// Returns `QuizServicesError` if storage initialization or the HTTP
    /// client setup fails.
    pub async fn new_sqlite(
        db_url: &str,
        settings: ClientSettings,
        clock: Clock,
        practice_code: Option<String>,
    ) -> Result<Self, QuizServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let submit_timeout = settings.submit_timeout();
        let backend: Arc<dyn QuizBackend> = Arc::new(HttpQuizBackend::new(settings)?);
        Ok(Self::from_parts(
            backend,
            storage.snapshots,
            clock,
            practice_code,
            submit_timeout,
        ))
    }

    /// Wire services from already-built collaborators.
    #[must_use]
    pub fn from_parts(
        backend: Arc<dyn QuizBackend>,
        snapshots: Arc<dyn SnapshotRepository>,
        clock: Clock,
        practice_code: Option<String>,
        submit_timeout: Duration,
    ) -> Self {
        let loader = SessionLoader::new(Arc::clone(&backend), Arc::clone(&snapshots));
        let gate = Arc::new(ContestGate::new(
            clock,
            Box::new(StaticAccessVerifier::new(practice_code)),
        ));
        Self {
            backend,
            snapshots,
            loader,
            gate,
            submit_timeout,
        }
    }

    #[must_use]
    pub fn backend(&self) -> Arc<dyn QuizBackend> {
        Arc::clone(&self.backend)
    }

    #[must_use]
    pub fn snapshots(&self) -> Arc<dyn SnapshotRepository> {
        Arc::clone(&self.snapshots)
    }

    #[must_use]
    pub fn gate(&self) -> Arc<ContestGate> {
        Arc::clone(&self.gate)
    }

    /// Fetch the scored attempt behind a completed contest.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the attempt cannot be fetched.
    pub async fn attempt_result(&self, attempt_id: &AttemptId) -> Result<QuizResult, BackendError> {
        info!(attempt = %attempt_id, "fetching completed attempt");
        self.backend.fetch_attempt(attempt_id).await
    }

    /// Load (or resume) the session for `launch` and wrap it in a runner.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the session cannot be loaded or its first
    /// snapshot cannot be written.
    pub async fn open(&self, launch: QuizLaunch) -> Result<QuizRunner, QuizError> {
        let loaded = self.loader.load(launch).await?;
        let driver = QuizDriver::start(
            loaded,
            Arc::clone(&self.snapshots),
            Arc::clone(&self.backend),
            self.submit_timeout,
        )
        .await?;
        Ok(QuizRunner::new(driver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_clock;

    #[tokio::test]
    async fn sqlite_services_open_without_network() {
        let settings = quiz_core::model::ClientSettingsDraft::new().validate().unwrap();
        let services = QuizServices::new_sqlite(
            "sqlite:file:quiz_services_smoke?mode=memory&cache=shared",
            settings,
            fixed_clock(),
            Some("code".into()),
        )
        .await
        .unwrap();

        let snapshot = services
            .snapshots()
            .load_snapshot(&quiz_core::model::SessionKey::Default)
            .await
            .unwrap();
        assert!(snapshot.is_none());
        assert!(services.gate().enter_practice(None).await.is_err());
    }
}
