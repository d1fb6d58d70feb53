use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;

/// Number of options every question carries.
pub const OPTION_COUNT: usize = 4;

/// A multiple-choice question as served to the client.
///
/// The correct answer is never part of this type; per-question analysis is
/// delivered by the backend after submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "_id")]
    id: QuestionId,
    #[serde(rename = "questionText")]
    text: String,
    options: [String; OPTION_COUNT],
}

impl Question {
    #[must_use]
    pub fn new(id: QuestionId, text: impl Into<String>, options: [String; OPTION_COUNT]) -> Self {
        Self {
            id,
            text: text.into(),
            options,
        }
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    #[must_use]
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|candidate| candidate == option)
    }

    /// Option at `index`, if any.
    #[must_use]
    pub fn option(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(String::as_str)
    }
}

/// Label shown next to an option: `A`, `B`, `C`, `D`.
#[must_use]
pub fn option_label(index: usize) -> Option<char> {
    if index < OPTION_COUNT {
        u8::try_from(index).ok().map(|offset| char::from(b'A' + offset))
    } else {
        None
    }
}

/// A recorded choice for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: QuestionId,
    pub selected_answer: String,
}

/// Wire form of an answer; unanswered questions carry `selectedAnswer: null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub selected_answer: Option<String>,
}

impl SubmittedAnswer {
    #[must_use]
    pub fn unanswered(question_id: QuestionId) -> Self {
        Self {
            question_id,
            selected_answer: None,
        }
    }
}

impl From<Answer> for SubmittedAnswer {
    fn from(answer: Answer) -> Self {
        Self {
            question_id: answer.question_id,
            selected_answer: Some(answer.selected_answer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_deserializes_backend_shape() {
        let json = r#"{
            "_id": "q1",
            "questionText": "2 + 2?",
            "options": ["1", "2", "3", "4"],
            "category": "Math",
            "difficulty": "Easy"
        }"#;
        let question: Question = serde_json::from_str(json).unwrap();
        assert_eq!(question.id().as_str(), "q1");
        assert_eq!(question.text(), "2 + 2?");
        assert!(question.has_option("4"));
        assert!(!question.has_option("5"));
    }

    #[test]
    fn question_with_wrong_option_count_is_rejected() {
        let json = r#"{"_id": "q1", "questionText": "?", "options": ["a", "b", "c"]}"#;
        assert!(serde_json::from_str::<Question>(json).is_err());
    }

    #[test]
    fn labels_cover_four_options() {
        assert_eq!(option_label(0), Some('A'));
        assert_eq!(option_label(3), Some('D'));
        assert_eq!(option_label(4), None);
    }

    #[test]
    fn unanswered_serializes_null() {
        let answer = SubmittedAnswer::unanswered(QuestionId::new("q2"));
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"questionId": "q2", "selectedAnswer": null})
        );
    }
}
