//! Admission checks run before a contest or practice quiz starts.

use async_trait::async_trait;
use quiz_core::Clock;
use quiz_core::model::{Contest, ContestWindow, Coordinates, QuizLaunch};
use tracing::{debug, info};

use crate::error::{BackendError, EntryError};

/// What an access code is being checked against.
#[derive(Debug, Clone, Copy)]
pub enum AccessTarget<'a> {
    Practice,
    Contest(&'a Contest),
}

/// Decides whether an access code opens a target.
#[async_trait]
pub trait AccessVerifier: Send + Sync {
    /// Whether the target can be entered without any code.
    fn is_open(&self, target: AccessTarget<'_>) -> bool;

    /// # Errors
    ///
    /// Returns `BackendError` if verification needs a remote call and it fails.
    async fn verify(&self, target: AccessTarget<'_>, code: &str) -> Result<bool, BackendError>;
}

/// Verifier backed by configuration and the contest listing itself.
#[derive(Debug, Clone, Default)]
pub struct StaticAccessVerifier {
    practice_code: Option<String>,
}

impl StaticAccessVerifier {
    #[must_use]
    pub fn new(practice_code: Option<String>) -> Self {
        let practice_code = practice_code
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty());
        Self { practice_code }
    }
}

#[async_trait]
impl AccessVerifier for StaticAccessVerifier {
    fn is_open(&self, target: AccessTarget<'_>) -> bool {
        match target {
            AccessTarget::Practice => self.practice_code.is_none(),
            AccessTarget::Contest(contest) => !contest.requires_access_code(),
        }
    }

    async fn verify(&self, target: AccessTarget<'_>, code: &str) -> Result<bool, BackendError> {
        let expected = match target {
            AccessTarget::Practice => self.practice_code.as_deref(),
            AccessTarget::Contest(contest) => contest.access_code.as_deref(),
        };
        Ok(expected.is_none_or(|expected| expected.trim() == code.trim()))
    }
}

/// Gatekeeper for starting quizzes.
pub struct ContestGate {
    clock: Clock,
    verifier: Box<dyn AccessVerifier>,
}

impl ContestGate {
    #[must_use]
    pub fn new(clock: Clock, verifier: Box<dyn AccessVerifier>) -> Self {
        Self { clock, verifier }
    }

    /// Admit the caller to `contest`.
    ///
    /// Checks run in order: completion, time window, venue fence, access code.
    ///
    /// # Errors
    ///
    /// Returns the first `EntryError` that applies.
    pub async fn enter_contest(
        &self,
        contest: &Contest,
        position: Option<Coordinates>,
        code: Option<&str>,
    ) -> Result<QuizLaunch, EntryError> {
        if contest.is_completed {
            return Err(EntryError::AlreadyCompleted {
                attempt_id: contest.attempt_id.clone(),
            });
        }

        match contest.window(self.clock.now()) {
            ContestWindow::Upcoming => {
                return Err(EntryError::NotStarted {
                    starts_at: contest.start_time,
                });
            }
            ContestWindow::Ended => return Err(EntryError::Ended),
            ContestWindow::Active => {}
        }

        if let Some(fence) = contest.geofence() {
            let position = position.ok_or(EntryError::LocationRequired)?;
            let distance_m = fence.distance_m(position);
            debug!(contest = %contest.id, distance_m, radius_m = fence.radius, "venue check");
            if distance_m > fence.radius {
                return Err(EntryError::TooFar {
                    distance_m,
                    radius_m: fence.radius,
                });
            }
        }

        self.check_code(AccessTarget::Contest(contest), code).await?;

        info!(contest = %contest.id, title = %contest.title, "contest entry granted");
        Ok(QuizLaunch::for_contest(contest))
    }

    /// Admit the caller to a practice quiz.
    ///
    /// # Errors
    ///
    /// Returns `EntryError::AccessCodeRequired` or `EntryError::AccessDenied`
    /// when a practice code is configured and not matched.
    pub async fn enter_practice(&self, code: Option<&str>) -> Result<QuizLaunch, EntryError> {
        self.check_code(AccessTarget::Practice, code).await?;
        Ok(QuizLaunch::practice())
    }

    /// Contests whose window at the gate's clock matches `window`.
    #[must_use]
    pub fn filter_window<'a>(&self, contests: &'a [Contest], window: ContestWindow) -> Vec<&'a Contest> {
        let now = self.clock.now();
        contests
            .iter()
            .filter(|contest| contest.window(now) == window)
            .collect()
    }

    async fn check_code(&self, target: AccessTarget<'_>, code: Option<&str>) -> Result<(), EntryError> {
        if self.verifier.is_open(target) {
            return Ok(());
        }
        let code = code
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .ok_or(EntryError::AccessCodeRequired)?;
        if self.verifier.verify(target, code).await? {
            Ok(())
        } else {
            Err(EntryError::AccessDenied)
        }
    }
}

impl std::fmt::Debug for ContestGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContestGate")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
