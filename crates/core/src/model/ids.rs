use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend identifier of a question.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    /// Creates a new `QuestionId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Backend identifier of a contest.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContestId(String);

impl ContestId {
    /// Creates a new `ContestId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Backend identifier of a scored attempt.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(String);

impl AttemptId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({})", self.0)
    }
}

impl fmt::Debug for ContestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContestId({})", self.0)
    }
}

impl fmt::Debug for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttemptId({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ContestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Session Key ───────────────────────────────────────────────────────────────

const SNAPSHOT_KEY_PREFIX: &str = "quiz_state_";
const DEFAULT_SESSION: &str = "default";

/// Identifies one quiz attempt's persisted state: a contest, or the practice slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SessionKey {
    Contest(ContestId),
    Default,
}

impl SessionKey {
    /// Key of the durable snapshot slot, `quiz_state_<contest id | default>`.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{SNAPSHOT_KEY_PREFIX}{self}")
    }

    #[must_use]
    pub fn contest_id(&self) -> Option<&ContestId> {
        match self {
            SessionKey::Contest(id) => Some(id),
            SessionKey::Default => None,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKey::Contest(id) => write!(f, "{id}"),
            SessionKey::Default => f.write_str(DEFAULT_SESSION),
        }
    }
}

/// Error type for parsing a session key from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSessionKeyError {
    raw: String,
}

impl fmt::Display for ParseSessionKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse session key from {:?}", self.raw)
    }
}

impl std::error::Error for ParseSessionKeyError {}

impl FromStr for SessionKey {
    type Err = ParseSessionKeyError;

    /// Accepts either a bare identifier or a full storage key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let id = raw.strip_prefix(SNAPSHOT_KEY_PREFIX).unwrap_or(raw);
        match id {
            "" => Err(ParseSessionKeyError { raw: s.to_string() }),
            DEFAULT_SESSION => Ok(SessionKey::Default),
            other => Ok(SessionKey::Contest(ContestId::new(other))),
        }
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contest_key_uses_contest_id() {
        let key = SessionKey::Contest(ContestId::new("65f0a1"));
        assert_eq!(key.storage_key(), "quiz_state_65f0a1");
    }

    #[test]
    fn practice_key_uses_default_marker() {
        assert_eq!(SessionKey::Default.storage_key(), "quiz_state_default");
    }

    #[test]
    fn session_key_parses_bare_and_prefixed_forms() {
        let bare: SessionKey = "abc".parse().unwrap();
        let prefixed: SessionKey = "quiz_state_abc".parse().unwrap();
        assert_eq!(bare, prefixed);
        assert_eq!("default".parse::<SessionKey>().unwrap(), SessionKey::Default);
    }

    #[test]
    fn session_key_rejects_empty() {
        assert!("  ".parse::<SessionKey>().is_err());
        assert!("quiz_state_".parse::<SessionKey>().is_err());
    }

    #[test]
    fn question_id_is_transparent_in_json() {
        let id = QuestionId::new("q1");
        assert_eq!(serde_json_string(&id), "\"q1\"");
    }

    fn serde_json_string(id: &QuestionId) -> String {
        serde_json::to_string(id).unwrap()
    }
}
