use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::question::{Answer, Question};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SnapshotError {
    #[error("snapshot has no questions")]
    NoQuestions,

    #[error("current index {index} out of range for {len} questions")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("snapshot holds {answers} answers for {questions} questions")]
    TooManyAnswers { answers: usize, questions: usize },

    #[error("answer at {index} does not belong to its question")]
    ForeignAnswer { index: usize },
}

/// Durable copy of an in-progress quiz, written after every accepted mutation.
///
/// Serialized as `{ questions, currentIndex, answers, timeLeft }` with `null`
/// marking unanswered slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSnapshot {
    pub questions: Vec<Question>,
    pub current_index: usize,
    #[serde(default)]
    pub answers: Vec<Option<Answer>>,
    pub time_left: u32,
}

impl QuizSnapshot {
    /// Check the snapshot can be restored into a session.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` describing the first inconsistency found.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let len = self.questions.len();
        if len == 0 {
            return Err(SnapshotError::NoQuestions);
        }
        if self.current_index >= len {
            return Err(SnapshotError::IndexOutOfRange {
                index: self.current_index,
                len,
            });
        }
        if self.answers.len() > len {
            return Err(SnapshotError::TooManyAnswers {
                answers: self.answers.len(),
                questions: len,
            });
        }

        for (index, (slot, question)) in self.answers.iter().zip(&self.questions).enumerate() {
            if let Some(answer) = slot {
                if &answer.question_id != question.id()
                    || !question.has_option(&answer.selected_answer)
                {
                    return Err(SnapshotError::ForeignAnswer { index });
                }
            }
        }

        Ok(())
    }

    /// Answers padded with empty slots up to the question count.
    pub(crate) fn padded_answers(&self) -> Vec<Option<Answer>> {
        let mut answers = self.answers.clone();
        answers.resize(self.questions.len(), None);
        answers
    }
}
