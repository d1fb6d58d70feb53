use thiserror::Error;

use crate::model::ids::SessionKey;
use crate::model::launch::QuizLaunch;
use crate::model::question::{Answer, Question, SubmittedAnswer};
use crate::model::snapshot::{QuizSnapshot, SnapshotError};

/// Seconds at or below which the countdown is shown as running low.
pub const LOW_TIME_SECS: u32 = 60;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("a quiz session needs at least one question")]
    EmptyQuestions,

    #[error("{option:?} is not an option of the current question")]
    UnknownOption { option: String },

    #[error("option index {index} is out of range")]
    ChoiceOutOfRange { index: usize },

    #[error("no submission is in progress")]
    NotSubmitting,

    #[error(transparent)]
    InvalidSnapshot(#[from] SnapshotError),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of a quiz session.
///
/// Loading is the time before a `QuizSession` exists at all, so it has no
/// variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizStatus {
    Active,
    Submitting,
    Terminated,
}

/// Outcome of feeding one event to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Step {
    /// State changed and stays `Active`.
    Applied,
    /// Event was a no-op.
    Ignored,
    /// Session moved from `Active` to `Submitting`.
    SubmitRequested,
}

/// Payload assembled when a session enters `Submitting`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub answers: Vec<SubmittedAnswer>,
    pub time_taken: u32,
}

/// Aggregated view of quiz progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizProgress {
    /// 1-based position of the current question.
    pub position: usize,
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub time_left: u32,
    pub status: QuizStatus,
}

impl QuizProgress {
    #[must_use]
    pub fn is_low_time(&self) -> bool {
        self.time_left <= LOW_TIME_SECS
    }

    #[must_use]
    pub fn clock(&self) -> String {
        format_clock(self.time_left)
    }
}

/// Formats seconds as `m:ss`.
#[must_use]
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Timed quiz attempt.
///
/// Questions are fixed at creation. Each answer slot can be written once.
/// `time_left` only ever decreases. Leaving `Active` happens through
/// `advance` on the last question, `tick` reaching zero, or `submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSession {
    key: SessionKey,
    questions: Vec<Question>,
    current_index: usize,
    answers: Vec<Option<Answer>>,
    time_left: u32,
    status: QuizStatus,
    allow_backtracking: bool,
    total_duration_secs: u32,
}

impl QuizSession {
    /// Begin a fresh attempt over `questions`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyQuestions` if no questions are provided.
    pub fn start(launch: &QuizLaunch, questions: Vec<Question>) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::EmptyQuestions);
        }
        let answers = vec![None; questions.len()];
        Ok(Self {
            key: launch.key.clone(),
            questions,
            current_index: 0,
            answers,
            time_left: launch.total_duration_secs,
            status: QuizStatus::Active,
            allow_backtracking: launch.allow_backtracking,
            total_duration_secs: launch.total_duration_secs,
        })
    }

    /// Rehydrate an attempt from its durable snapshot.
    ///
    /// Questions, index, answers and remaining time are taken verbatim; the
    /// fixed session parameters come from `launch`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidSnapshot` if the snapshot is malformed.
    pub fn restore(launch: &QuizLaunch, snapshot: QuizSnapshot) -> Result<Self, SessionError> {
        snapshot.validate()?;
        let answers = snapshot.padded_answers();
        Ok(Self {
            key: launch.key.clone(),
            questions: snapshot.questions,
            current_index: snapshot.current_index,
            answers,
            time_left: snapshot.time_left,
            status: QuizStatus::Active,
            allow_backtracking: launch.allow_backtracking,
            total_duration_secs: launch.total_duration_secs,
        })
    }

    #[must_use]
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    #[must_use]
    pub fn status(&self) -> QuizStatus {
        self.status
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == QuizStatus::Active
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<Answer>] {
        &self.answers
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    #[must_use]
    pub fn total_duration_secs(&self) -> u32 {
        self.total_duration_secs
    }

    #[must_use]
    pub fn allow_backtracking(&self) -> bool {
        self.allow_backtracking
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current_index]
    }

    #[must_use]
    pub fn current_answer(&self) -> Option<&Answer> {
        self.answers[self.current_index].as_ref()
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current_index + 1 == self.questions.len()
    }

    #[must_use]
    pub fn can_retreat(&self) -> bool {
        self.allow_backtracking && self.current_index > 0
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|slot| slot.is_some()).count()
    }

    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        let answered = self.answered_count();
        QuizProgress {
            position: self.current_index + 1,
            total: self.questions.len(),
            answered,
            remaining: self.questions.len() - answered,
            time_left: self.time_left,
            status: self.status,
        }
    }

    /// Durable copy of the mutable state.
    #[must_use]
    pub fn snapshot(&self) -> QuizSnapshot {
        QuizSnapshot {
            questions: self.questions.clone(),
            current_index: self.current_index,
            answers: self.answers.clone(),
            time_left: self.time_left,
        }
    }

    // ─── Transitions ───────────────────────────────────────────────────────────

    /// Record `option` for the current question.
    ///
    /// Already-answered questions are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownOption` if `option` is not one of the
    /// current question's options.
    pub fn answer(&mut self, option: &str) -> Result<Step, SessionError> {
        if !self.is_active() || self.answers[self.current_index].is_some() {
            return Ok(Step::Ignored);
        }
        let question = &self.questions[self.current_index];
        if !question.has_option(option) {
            return Err(SessionError::UnknownOption {
                option: option.to_string(),
            });
        }

        self.answers[self.current_index] = Some(Answer {
            question_id: question.id().clone(),
            selected_answer: option.to_string(),
        });
        Ok(Step::Applied)
    }

    /// Record the option at `index` (0 = `A`) for the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ChoiceOutOfRange` for an index past the last option.
    pub fn answer_choice(&mut self, index: usize) -> Result<Step, SessionError> {
        let option = self
            .current_question()
            .option(index)
            .ok_or(SessionError::ChoiceOutOfRange { index })?
            .to_string();
        self.answer(&option)
    }

    /// Move to the next question, or request submission from the last one.
    pub fn advance(&mut self) -> Step {
        if !self.is_active() {
            return Step::Ignored;
        }
        if self.is_last() {
            return self.request_submission();
        }
        self.current_index += 1;
        Step::Applied
    }

    /// Move back one question when backtracking is allowed.
    pub fn retreat(&mut self) -> Step {
        if !self.is_active() || !self.can_retreat() {
            return Step::Ignored;
        }
        self.current_index -= 1;
        Step::Applied
    }

    /// One second of countdown.
    pub fn tick(&mut self) -> Step {
        if !self.is_active() {
            return Step::Ignored;
        }
        if self.time_left == 0 {
            return self.request_submission();
        }
        self.time_left -= 1;
        if self.time_left == 0 {
            return self.request_submission();
        }
        Step::Applied
    }

    /// Finish early, or retry after a failed submission.
    pub fn submit(&mut self) -> Step {
        self.request_submission()
    }

    fn request_submission(&mut self) -> Step {
        if !self.is_active() {
            return Step::Ignored;
        }
        self.status = QuizStatus::Submitting;
        Step::SubmitRequested
    }

    /// Full answer set and elapsed time for the pending submission.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSubmitting` outside of `Submitting`.
    pub fn submission(&self) -> Result<Submission, SessionError> {
        if self.status != QuizStatus::Submitting {
            return Err(SessionError::NotSubmitting);
        }
        let answers = self
            .questions
            .iter()
            .zip(&self.answers)
            .map(|(question, slot)| match slot {
                Some(answer) => SubmittedAnswer::from(answer.clone()),
                None => SubmittedAnswer::unanswered(question.id().clone()),
            })
            .collect();

        Ok(Submission {
            answers,
            time_taken: self.total_duration_secs.saturating_sub(self.time_left),
        })
    }

    /// Return to `Active` after a failed submission.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSubmitting` outside of `Submitting`.
    pub fn rollback(&mut self) -> Result<(), SessionError> {
        if self.status != QuizStatus::Submitting {
            return Err(SessionError::NotSubmitting);
        }
        self.status = QuizStatus::Active;
        Ok(())
    }

    /// Mark the backend-confirmed end of the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSubmitting` outside of `Submitting`.
    pub fn terminate(&mut self) -> Result<(), SessionError> {
        if self.status != QuizStatus::Submitting {
            return Err(SessionError::NotSubmitting);
        }
        self.status = QuizStatus::Terminated;
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
