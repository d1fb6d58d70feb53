use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{QuizLaunch, QuizResult, QuizSession, QuizStatus, SessionError, Step};
use storage::repository::SnapshotRepository;
use tracing::{debug, info, warn};

use super::loader::LoadedSession;
use crate::backend::{QuizBackend, SubmitRequest, submit_with_timeout};
use crate::error::{BackendError, QuizError};

/// Writes each accepted transition of a `QuizSession` to its durable slot
/// and owns the exactly-once submission.
///
/// A failed write leaves the slot behind the session; the next event, even an
/// ignored one, writes the current state again until the slot catches up.
pub struct QuizDriver {
    session: QuizSession,
    launch: QuizLaunch,
    snapshots: Arc<dyn SnapshotRepository>,
    backend: Arc<dyn QuizBackend>,
    submit_timeout: Duration,
    in_flight: bool,
    snapshot_behind: bool,
}

impl QuizDriver {
    /// Take over a loaded session and write its first snapshot.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Storage` if the snapshot cannot be written.
    pub async fn start(
        loaded: LoadedSession,
        snapshots: Arc<dyn SnapshotRepository>,
        backend: Arc<dyn QuizBackend>,
        submit_timeout: Duration,
    ) -> Result<Self, QuizError> {
        let mut driver = Self {
            session: loaded.session,
            launch: loaded.launch,
            snapshots,
            backend,
            submit_timeout,
            in_flight: false,
            snapshot_behind: false,
        };
        driver.persist().await?;
        Ok(driver)
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    #[must_use]
    pub fn launch(&self) -> &QuizLaunch {
        &self.launch
    }

    #[must_use]
    pub fn backend(&self) -> Arc<dyn QuizBackend> {
        Arc::clone(&self.backend)
    }

    #[must_use]
    pub fn submit_timeout(&self) -> Duration {
        self.submit_timeout
    }

    /// Whether a submission call has been handed out and not yet finished.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Whether the last snapshot write failed and the slot holds older state.
    #[must_use]
    pub fn is_snapshot_behind(&self) -> bool {
        self.snapshot_behind
    }

    // ─── Events ────────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `QuizError::Session` for an unknown option, or
    /// `QuizError::Storage` if the snapshot write fails.
    pub async fn answer(&mut self, option: &str) -> Result<Step, QuizError> {
        let step = self.session.answer(option)?;
        self.commit(step).await
    }

    /// # Errors
    ///
    /// Returns `QuizError::Session` for an out-of-range choice, or
    /// `QuizError::Storage` if the snapshot write fails.
    pub async fn answer_choice(&mut self, index: usize) -> Result<Step, QuizError> {
        let step = self.session.answer_choice(index)?;
        self.commit(step).await
    }

    /// # Errors
    ///
    /// Returns `QuizError::Storage` if the snapshot write fails.
    pub async fn advance(&mut self) -> Result<Step, QuizError> {
        let step = self.session.advance();
        self.commit(step).await
    }

    /// # Errors
    ///
    /// Returns `QuizError::Storage` if the snapshot write fails.
    pub async fn retreat(&mut self) -> Result<Step, QuizError> {
        let step = self.session.retreat();
        self.commit(step).await
    }

    /// # Errors
    ///
    /// Returns `QuizError::Storage` if the snapshot write fails.
    pub async fn tick(&mut self) -> Result<Step, QuizError> {
        let step = self.session.tick();
        self.commit(step).await
    }

    /// # Errors
    ///
    /// Returns `QuizError::Storage` if the snapshot write fails.
    pub async fn submit(&mut self) -> Result<Step, QuizError> {
        let step = self.session.submit();
        self.commit(step).await
    }

    async fn commit(&mut self, step: Step) -> Result<Step, QuizError> {
        match step {
            Step::Ignored => {
                debug!(key = %self.launch.key, status = ?self.session.status(), "event ignored");
                if self.snapshot_behind {
                    self.persist().await?;
                }
            }
            Step::Applied => self.persist().await?,
            Step::SubmitRequested => {
                info!(
                    key = %self.launch.key,
                    time_left = self.session.time_left(),
                    "quiz submission requested"
                );
                self.persist().await?;
            }
        }
        Ok(step)
    }

    async fn persist(&mut self) -> Result<(), QuizError> {
        match self
            .snapshots
            .save_snapshot(&self.launch.key, &self.session.snapshot())
            .await
        {
            Ok(()) => {
                if self.snapshot_behind {
                    info!(key = %self.launch.key, "quiz snapshot caught up");
                    self.snapshot_behind = false;
                }
                Ok(())
            }
            Err(err) => {
                self.snapshot_behind = true;
                warn!(
                    key = %self.launch.key,
                    error = %err,
                    "quiz snapshot is behind the session; retrying on the next event"
                );
                Err(err.into())
            }
        }
    }

    // ─── Submission ────────────────────────────────────────────────────────────

    /// Hand out the submission request for the current `Submitting` episode.
    ///
    /// Returns `None` when not submitting or when the request was already
    /// handed out, so at most one backend call is made per episode.
    pub fn begin_submission(&mut self) -> Option<SubmitRequest> {
        if self.in_flight || self.session.status() != QuizStatus::Submitting {
            return None;
        }
        let submission = self.session.submission().ok()?;
        self.in_flight = true;
        Some(SubmitRequest::new(&self.launch, submission))
    }

    /// Apply the outcome of the backend submission call.
    ///
    /// Success removes the snapshot and ends the session. Failure returns the
    /// session to `Active` with its snapshot untouched.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Submission` when `outcome` is a failure, or
    /// `QuizError::Session` if no submission was in progress.
    pub async fn finish_submission(
        &mut self,
        outcome: Result<QuizResult, BackendError>,
    ) -> Result<QuizResult, QuizError> {
        self.in_flight = false;
        match outcome {
            Ok(result) => {
                self.session.terminate()?;
                if let Err(err) = self.snapshots.delete_snapshot(&self.launch.key).await {
                    warn!(key = %self.launch.key, error = %err, "submitted quiz left a stale snapshot");
                }
                info!(key = %self.launch.key, score = ?result.score, "quiz submitted");
                Ok(result)
            }
            Err(err) => {
                self.session.rollback()?;
                warn!(
                    key = %self.launch.key,
                    error = %err,
                    time_left = self.session.time_left(),
                    "quiz submission failed; session is active again"
                );
                Err(QuizError::Submission(err))
            }
        }
    }

    /// Run the pending submission inline, bounded by the submission timeout.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Session` when the session is not submitting or a
    /// call is already in flight, and `QuizError::Submission` when the call fails.
    pub async fn submit_now(&mut self) -> Result<QuizResult, QuizError> {
        let request = self
            .begin_submission()
            .ok_or(SessionError::NotSubmitting)?;
        let outcome = submit_with_timeout(self.backend.as_ref(), &request, self.submit_timeout).await;
        self.finish_submission(outcome).await
    }
}

impl fmt::Debug for QuizDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizDriver")
            .field("key", &self.launch.key)
            .field("status", &self.session.status())
            .field("current_index", &self.session.current_index())
            .field("time_left", &self.session.time_left())
            .field("in_flight", &self.in_flight)
            .field("snapshot_behind", &self.snapshot_behind)
            .finish_non_exhaustive()
    }
}
