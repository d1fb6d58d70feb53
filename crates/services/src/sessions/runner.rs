use std::time::Duration;

use quiz_core::model::{QuizResult, QuizStatus};
use tokio::sync::mpsc;
use tracing::debug;

use super::countdown::Countdown;
use super::driver::QuizDriver;
use super::view::QuizView;
use crate::backend::submit_with_timeout;
use crate::error::{BackendError, QuizError};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// User input accepted while a quiz runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizCommand {
    Answer(String),
    AnswerChoice(usize),
    Advance,
    Retreat,
    Submit,
}

/// Notifications for whatever renders the quiz.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizEvent {
    Progress(QuizView),
    /// Transient, user-facing notice (rejected input, persistence trouble).
    Notice(String),
    /// The submission failed; the quiz is active again and can be retried.
    SubmissionFailed(String),
    Submitted(QuizResult),
}

enum Internal {
    Tick(u64),
    Submitted(Result<QuizResult, BackendError>),
}

/// Event loop serializing user commands, countdown ticks and submission
/// completion for one session.
#[derive(Debug)]
pub struct QuizRunner {
    driver: QuizDriver,
    tick_period: Duration,
}

struct Loop {
    internal_tx: mpsc::UnboundedSender<Internal>,
    events: mpsc::UnboundedSender<QuizEvent>,
    countdown: Option<Countdown>,
    generation: u64,
}

impl QuizRunner {
    #[must_use]
    pub fn new(driver: QuizDriver) -> Self {
        Self {
            driver,
            tick_period: TICK_PERIOD,
        }
    }

    #[must_use]
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    #[must_use]
    pub fn driver(&self) -> &QuizDriver {
        &self.driver
    }

    /// Drive the session until it is submitted or the command channel closes.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Abandoned` when `commands` closes before a
    /// successful submission; the snapshot stays in place for a later resume.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<QuizCommand>,
        events: mpsc::UnboundedSender<QuizEvent>,
    ) -> Result<QuizResult, QuizError> {
        let (internal_tx, mut internal_rx) = mpsc::unbounded_channel();
        let mut state = Loop {
            internal_tx,
            events,
            countdown: None,
            generation: 0,
        };
        let mut commands_open = true;

        // A resumed session may already be out of time.
        if self.driver.session().is_active() && self.driver.session().time_left() == 0 {
            let step = self.driver.tick().await;
            self.report(step, &state);
        }
        state.emit(QuizEvent::Progress(QuizView::from_session(self.driver.session())));

        loop {
            self.sync(&mut state);

            if !commands_open && !self.driver.is_in_flight() {
                return Err(QuizError::Abandoned);
            }

            tokio::select! {
                command = commands.recv(), if commands_open => match command {
                    Some(command) => self.handle_command(command, &state).await,
                    None => {
                        debug!(key = %self.driver.launch().key, "command channel closed");
                        commands_open = false;
                        continue;
                    }
                },
                Some(internal) = internal_rx.recv() => match internal {
                    Internal::Tick(generation) => {
                        if state.countdown.as_ref().is_some_and(|c| c.generation() == generation) {
                            let step = self.driver.tick().await;
                            self.report(step, &state);
                        } else {
                            debug!(generation, "stale tick dropped");
                        }
                    }
                    Internal::Submitted(outcome) => {
                        match self.driver.finish_submission(outcome).await {
                            Ok(result) => {
                                state.emit(QuizEvent::Submitted(result.clone()));
                                return Ok(result);
                            }
                            Err(err) => state.emit(QuizEvent::SubmissionFailed(err.to_string())),
                        }
                    }
                },
            }

            state.emit(QuizEvent::Progress(QuizView::from_session(self.driver.session())));
        }
    }

    /// Align the countdown and the in-flight call with the session status.
    fn sync(&mut self, state: &mut Loop) {
        match self.driver.session().status() {
            QuizStatus::Active => {
                if state.countdown.is_none() && self.driver.session().time_left() > 0 {
                    state.generation += 1;
                    state.countdown = Some(Countdown::spawn(
                        state.generation,
                        self.tick_period,
                        state.internal_tx.clone(),
                        Internal::Tick,
                    ));
                }
            }
            QuizStatus::Submitting | QuizStatus::Terminated => {
                state.countdown = None;
            }
        }

        if let Some(request) = self.driver.begin_submission() {
            let backend = self.driver.backend();
            let limit = self.driver.submit_timeout();
            let tx = state.internal_tx.clone();
            tokio::spawn(async move {
                let outcome = submit_with_timeout(backend.as_ref(), &request, limit).await;
                let _ = tx.send(Internal::Submitted(outcome));
            });
        }
    }

    async fn handle_command(&mut self, command: QuizCommand, state: &Loop) {
        let step = match command {
            QuizCommand::Answer(option) => self.driver.answer(&option).await,
            QuizCommand::AnswerChoice(index) => self.driver.answer_choice(index).await,
            QuizCommand::Advance => self.driver.advance().await,
            QuizCommand::Retreat => self.driver.retreat().await,
            QuizCommand::Submit => self.driver.submit().await,
        };
        self.report(step, state);
    }

    fn report<T>(&self, result: Result<T, QuizError>, state: &Loop) {
        if let Err(err) = result {
            debug!(key = %self.driver.launch().key, error = %err, "quiz event reported");
            state.emit(QuizEvent::Notice(err.to_string()));
        }
    }
}

impl Loop {
    fn emit(&self, event: QuizEvent) {
        let _ = self.events.send(event);
    }
}
