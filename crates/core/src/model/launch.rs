use crate::model::contest::Contest;
use crate::model::ids::SessionKey;

pub const ALL_FILTER: &str = "All";
pub const DEFAULT_QUESTION_LIMIT: u32 = 10;
pub const DEFAULT_DURATION_SECS: u32 = 30 * 60;
pub const PRACTICE_TITLE: &str = "Practice Session";

/// Converts a contest duration in minutes to seconds, falling back to the default.
#[must_use]
pub fn duration_secs_from_minutes(minutes: Option<u32>) -> u32 {
    match minutes {
        Some(minutes) if minutes > 0 => minutes.saturating_mul(60),
        _ => DEFAULT_DURATION_SECS,
    }
}

/// Selection criteria and fixed session parameters supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizLaunch {
    pub key: SessionKey,
    pub category: String,
    pub difficulty: String,
    pub limit: u32,
    pub total_duration_secs: u32,
    pub allow_backtracking: bool,
    pub quiz_title: String,
}

impl QuizLaunch {
    /// Open practice over every category and difficulty.
    #[must_use]
    pub fn practice() -> Self {
        Self {
            key: SessionKey::Default,
            category: ALL_FILTER.to_string(),
            difficulty: ALL_FILTER.to_string(),
            limit: DEFAULT_QUESTION_LIMIT,
            total_duration_secs: DEFAULT_DURATION_SECS,
            allow_backtracking: true,
            quiz_title: PRACTICE_TITLE.to_string(),
        }
    }

    #[must_use]
    pub fn for_contest(contest: &Contest) -> Self {
        Self {
            key: SessionKey::Contest(contest.id.clone()),
            category: contest.category.clone(),
            difficulty: contest.difficulty.clone(),
            limit: contest.question_limit.unwrap_or(DEFAULT_QUESTION_LIMIT),
            total_duration_secs: duration_secs_from_minutes(contest.duration),
            allow_backtracking: contest.allow_backtracking,
            quiz_title: contest.title.clone(),
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_duration_secs(mut self, secs: u32) -> Self {
        self.total_duration_secs = secs;
        self
    }

    #[must_use]
    pub fn with_backtracking(mut self, allow: bool) -> Self {
        self.allow_backtracking = allow;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn practice_defaults() {
        let launch = QuizLaunch::practice();
        assert_eq!(launch.key, SessionKey::Default);
        assert_eq!(launch.category, "All");
        assert_eq!(launch.limit, 10);
        assert_eq!(launch.total_duration_secs, 1800);
        assert!(launch.allow_backtracking);
    }

    #[test]
    fn zero_or_missing_duration_falls_back() {
        assert_eq!(duration_secs_from_minutes(None), 1800);
        assert_eq!(duration_secs_from_minutes(Some(0)), 1800);
        assert_eq!(duration_secs_from_minutes(Some(5)), 300);
    }
}
