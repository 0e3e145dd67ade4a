use std::time::Duration;

use serde::Deserialize;

use crate::error::ClientError;

/// Name of the cookie carrying the learner's session.
pub const SESSION_COOKIE: &str = "session";

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Connection settings for the Nutq web backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Origin of the backend, e.g. `https://nutq.app`.
    pub base_url: String,
    /// Session token sent as the `session` cookie on score requests.
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            session_token: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Absolute URL for `path` on the backend.
    pub fn endpoint(&self, path: &str) -> Result<String, ClientError> {
        let base = self.base_url.trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        Ok(format!("{base}/{}", path.trim_start_matches('/')))
    }

    pub fn http_client(&self) -> Result<reqwest::Client, ClientError> {
        Ok(reqwest::Client::builder()
            .timeout(Duration::from_millis(self.timeout_ms))
            .build()?)
    }
}
