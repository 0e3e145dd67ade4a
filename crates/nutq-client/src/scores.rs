use std::collections::BTreeMap;

use async_trait::async_trait;
use nutq_attempt::{PersistenceGateway, ScoreSubmission, ScoreSummary, error::PersistenceError};
use reqwest::header::COOKIE;
use serde::{Deserialize, Serialize};

use crate::config::{ClientConfig, SESSION_COOKIE};
use crate::error::ClientError;

pub const SCORES_PATH: &str = "/api/visitor-scores";

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    word_uuid: &'a str,
    score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    category_slug: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    ok: bool,
    #[serde(default)]
    overall: Option<f64>,
    #[serde(default)]
    scores: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    message: Option<String>,
}

/// Stores accepted scores through the backend's visitor score endpoint.
#[derive(Clone)]
pub struct HttpScoreGateway {
    http: reqwest::Client,
    url: String,
    session_token: Option<String>,
}

impl std::fmt::Debug for HttpScoreGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpScoreGateway")
            .field("url", &self.url)
            .field("authenticated", &self.session_token.is_some())
            .finish_non_exhaustive()
    }
}

impl HttpScoreGateway {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::with_client(config.http_client()?, config)
    }

    pub fn with_client(http: reqwest::Client, config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self {
            http,
            url: config.endpoint(SCORES_PATH)?,
            session_token: config.session_token.clone(),
        })
    }
}

fn to_score(value: f64) -> u8 {
    value.clamp(0.0, 100.0).round() as u8
}

#[async_trait]
impl PersistenceGateway for HttpScoreGateway {
    async fn save_score(
        &self,
        submission: ScoreSubmission,
    ) -> Result<ScoreSummary, PersistenceError> {
        let body = ScoreRequest {
            word_uuid: &submission.word_id,
            score: submission.score.min(100),
            category_slug: submission.category_id.as_deref(),
        };

        let mut request = self.http.put(&self.url).json(&body);
        if let Some(token) = &self.session_token {
            request = request.header(COOKIE, format!("{SESSION_COOKIE}={token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| PersistenceError::Transport(e.to_string()))?;
        let status = response.status();
        let parsed = response.json::<ScoreResponse>().await;

        match parsed {
            Ok(body) if status.is_success() && body.ok => {
                tracing::debug!(
                    word_id = %submission.word_id,
                    score = submission.score,
                    overall = ?body.overall,
                    "score saved"
                );
                Ok(ScoreSummary {
                    overall: body.overall.map(to_score),
                    per_word: body
                        .scores
                        .unwrap_or_default()
                        .into_iter()
                        .map(|(word, score)| (word, to_score(score)))
                        .collect(),
                })
            }
            Ok(body) => {
                let message = body.message.unwrap_or_else(|| status.to_string());
                tracing::warn!(%status, %message, "score not saved");
                if status.is_server_error() {
                    Err(PersistenceError::Transport(message))
                } else {
                    Err(PersistenceError::Rejected(message))
                }
            }
            Err(e) if status.is_success() => Err(PersistenceError::Transport(format!(
                "malformed score response: {e}"
            ))),
            Err(_) => {
                tracing::warn!(%status, "score not saved");
                Err(PersistenceError::Transport(status.to_string()))
            }
        }
    }
}
