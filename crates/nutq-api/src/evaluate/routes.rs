use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use nutq_attempt::SessionConfig;
use nutq_eval::{Decision, VendorAssessment, edit_distance, normalize, similarity};
use validator::Validate;

use super::models::{EvaluateRequest, EvaluateResponse, NormalizeRequest, NormalizeResponse};
use crate::{ApiState, error::ApiError, metrics::record_decision};

/// Create the evaluation routes
pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/evaluate", post(evaluate))
        .route("/normalize", post(normalize_text))
        .route("/session-config", get(session_config))
}

async fn evaluate(
    State(state): State<ApiState>,
    Json(payload): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    payload.validate()?;

    let target_normalized = normalize(&payload.target);
    if target_normalized.is_empty() {
        return Err(ApiError::Validation(
            "target contains no letters or digits".to_string(),
        ));
    }
    let recognized_normalized = normalize(&payload.recognized_text);

    let assessment = VendorAssessment {
        score: payload.score,
        pronunciation_score: payload.pronunciation_score,
        error_type: payload.error_type,
    };
    let decision = state
        .policy
        .decide(&recognized_normalized, &target_normalized, &assessment);
    record_decision(&decision);

    let response = match decision {
        Decision::Accept {
            score,
            basis,
            similarity,
        } => EvaluateResponse {
            accepted: true,
            score: Some(score),
            basis: Some(basis),
            reason: None,
            message: None,
            similarity,
            recognized_normalized,
            target_normalized,
            passes: state.policy.passes(score),
        },
        Decision::Reject { reason, similarity } => EvaluateResponse {
            accepted: false,
            score: None,
            basis: None,
            reason: Some(reason),
            message: Some(reason.message().to_string()),
            similarity,
            recognized_normalized,
            target_normalized,
            passes: false,
        },
    };

    Ok(Json(response))
}

async fn normalize_text(
    Json(payload): Json<NormalizeRequest>,
) -> Result<Json<NormalizeResponse>, ApiError> {
    payload.validate()?;

    let normalized = normalize(&payload.text);
    let compared = payload.compare_to.as_deref().map(normalize);

    Ok(Json(NormalizeResponse {
        edit_distance: compared.as_deref().map(|other| edit_distance(&normalized, other)),
        similarity: compared.as_deref().map(|other| similarity(&normalized, other)),
        normalized,
    }))
}

async fn session_config(State(state): State<ApiState>) -> Json<SessionConfig> {
    Json(state.session)
}
