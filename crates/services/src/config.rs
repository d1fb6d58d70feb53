//! Environment-driven configuration for the quiz client.

use std::env;

use quiz_core::model::ClientSettingsDraft;

pub const API_URL_VAR: &str = "QUIZ_API_URL";
pub const API_TOKEN_VAR: &str = "QUIZ_API_TOKEN";
pub const API_TIMEOUT_VAR: &str = "QUIZ_API_TIMEOUT_SECS";
pub const SUBMIT_TIMEOUT_VAR: &str = "QUIZ_SUBMIT_TIMEOUT_SECS";
pub const PRACTICE_CODE_VAR: &str = "QUIZ_PRACTICE_CODE";
pub const DB_URL_VAR: &str = "QUIZ_DB_URL";

/// Draft settings read from the process environment.
///
/// Callers may override fields (CLI flags) before validating.
#[must_use]
pub fn settings_draft_from_env() -> ClientSettingsDraft {
    settings_draft_from(|name| env::var(name).ok())
}

/// Draft settings read through `lookup`.
///
/// Unparseable timeouts fall back to their defaults.
pub fn settings_draft_from(lookup: impl Fn(&str) -> Option<String>) -> ClientSettingsDraft {
    ClientSettingsDraft {
        api_base_url: non_blank(lookup(API_URL_VAR)),
        api_token: non_blank(lookup(API_TOKEN_VAR)),
        request_timeout_secs: lookup(API_TIMEOUT_VAR).and_then(|raw| raw.trim().parse().ok()),
        submit_timeout_secs: lookup(SUBMIT_TIMEOUT_VAR).and_then(|raw| raw.trim().parse().ok()),
    }
}

#[must_use]
pub fn practice_code_from_env() -> Option<String> {
    non_blank(env::var(PRACTICE_CODE_VAR).ok())
}

#[must_use]
pub fn db_url_from_env() -> Option<String> {
    non_blank(env::var(DB_URL_VAR).ok())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
