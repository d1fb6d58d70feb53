use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 30;

/// Validated settings for talking to the quiz backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientSettings {
    api_base_url: Url,
    api_token: Option<String>,
    request_timeout: Duration,
    submit_timeout: Duration,
}

#[derive(Clone, Debug, Default)]
pub struct ClientSettingsDraft {
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub submit_timeout_secs: Option<u64>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("timeouts must be greater than zero")]
    ZeroTimeout,
}

impl ClientSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and normalize the draft.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the base URL does not parse or a timeout is zero.
    pub fn validate(self) -> Result<ClientSettings, SettingsError> {
        let raw_url =
            normalize_optional(self.api_base_url).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_base_url = Url::parse(raw_url.trim_end_matches('/'))
            .map_err(|_| SettingsError::InvalidBaseUrl(raw_url.clone()))?;
        if api_base_url.cannot_be_a_base() {
            return Err(SettingsError::InvalidBaseUrl(api_base_url.to_string()));
        }

        let request_timeout_secs = self
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        let submit_timeout_secs = self.submit_timeout_secs.unwrap_or(DEFAULT_SUBMIT_TIMEOUT_SECS);
        if request_timeout_secs == 0 || submit_timeout_secs == 0 {
            return Err(SettingsError::ZeroTimeout);
        }

        Ok(ClientSettings {
            api_base_url,
            api_token: normalize_optional(self.api_token),
            request_timeout: Duration::from_secs(request_timeout_secs),
            submit_timeout: Duration::from_secs(submit_timeout_secs),
        })
    }
}

impl ClientSettings {
    #[must_use]
    pub fn api_base_url(&self) -> &Url {
        &self.api_base_url
    }

    /// Absolute URL of an API route relative to the base URL.
    #[must_use]
    pub fn endpoint(&self, route: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.as_str().trim_end_matches('/'),
            route.trim_start_matches('/')
        )
    }

    #[must_use]
    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub fn submit_timeout(&self) -> Duration {
        self.submit_timeout
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
