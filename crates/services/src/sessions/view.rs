use quiz_core::model::{Question, QuizProgress, QuizSession};

/// Presentation-agnostic picture of the session after an event.
///
/// Carries no pre-formatted strings; the renderer decides how to show the
/// clock and option labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizView {
    pub progress: QuizProgress,
    pub question: Question,
    pub selected: Option<String>,
    pub can_retreat: bool,
    pub is_last: bool,
}

impl QuizView {
    #[must_use]
    pub fn from_session(session: &QuizSession) -> Self {
        Self {
            progress: session.progress(),
            question: session.current_question().clone(),
            selected: session
                .current_answer()
                .map(|answer| answer.selected_answer.clone()),
            can_retreat: session.can_retreat(),
            is_last: session.is_last(),
        }
    }
}
