use nutq_eval::{AcceptanceBasis, RejectReason};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct EvaluateRequest {
    /// Target word as displayed, vocalized or not.
    #[validate(length(min = 1, max = 200))]
    pub target: String,
    #[validate(length(max = 500))]
    pub recognized_text: String,
    #[validate(range(min = 0.0, max = 100.0))]
    pub score: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub pronunciation_score: Option<f64>,
    #[validate(length(max = 64))]
    pub error_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluateResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basis: Option<AcceptanceBasis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
    /// Learner-facing message for a rejection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub similarity: f64,
    pub recognized_normalized: String,
    pub target_normalized: String,
    /// Whether the score is high enough to move on to the next word.
    pub passes: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NormalizeRequest {
    #[validate(length(max = 1000))]
    pub text: String,
    /// Optional second text to measure against.
    #[validate(length(max = 1000))]
    pub compare_to: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NormalizeResponse {
    pub normalized: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_distance: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}
