use async_trait::async_trait;
use nutq_attempt::{AuthToken, AuthorizationProvider, error::AuthorizationError};
use reqwest::header::CACHE_CONTROL;

use crate::{config::ClientConfig, error::ClientError};

pub const TOKEN_PATH: &str = "/api/azure-speech-token";

/// Fetches recognizer tokens from the backend's token endpoint.
///
/// Every call hits the endpoint; the backend is responsible for caching.
#[derive(Debug, Clone)]
pub struct HttpAuthorizationProvider {
    http: reqwest::Client,
    url: String,
}

impl HttpAuthorizationProvider {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::with_client(config.http_client()?, config)
    }

    pub fn with_client(http: reqwest::Client, config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self {
            http,
            url: config.endpoint(TOKEN_PATH)?,
        })
    }
}

#[async_trait]
impl AuthorizationProvider for HttpAuthorizationProvider {
    async fn fetch_token(&self) -> Result<AuthToken, AuthorizationError> {
        let response = self
            .http
            .get(&self.url)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|e| AuthorizationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %self.url, %status, "token request failed");
            return Err(AuthorizationError::Status(status.as_u16()));
        }

        let token: AuthToken = response
            .json()
            .await
            .map_err(|e| AuthorizationError::Malformed(e.to_string()))?;
        if token.token.is_empty() || token.region.is_empty() {
            return Err(AuthorizationError::Malformed(
                "token and region must not be empty".to_string(),
            ));
        }

        tracing::debug!(region = %token.region, "recognizer token fetched");
        Ok(token)
    }
}
