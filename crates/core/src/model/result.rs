use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::ids::AttemptId;

/// Scored attempt returned by the backend after a successful submission.
///
/// Only the fields the client reads are typed; everything else is kept in
/// `extra` so a results view can render analysis the backend chooses to send.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<AttemptId>,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub total_questions: Option<u32>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub time_taken: Option<u32>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_analysis_published: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One graded answer from a published analysis.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerReview {
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub selected_answer: Option<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub is_correct: bool,
}

impl QuizResult {
    /// Score as a percentage, once results are published.
    #[must_use]
    pub fn percentage(&self) -> Option<f64> {
        if !self.is_published {
            return None;
        }
        match (self.score, self.total_questions) {
            (Some(score), Some(total)) if total > 0 => {
                Some(f64::from(score) / f64::from(total) * 100.0)
            }
            _ => None,
        }
    }

    /// Per-question analysis carried in `extra`, once the backend publishes it.
    ///
    /// `None` while unpublished or when the payload has no readable analysis.
    #[must_use]
    pub fn analysis(&self) -> Option<Vec<AnswerReview>> {
        if !self.is_published || !self.is_analysis_published {
            return None;
        }
        let questions = self.extra.get("questions")?;
        serde_json::from_value(questions.clone()).ok()
    }
}
