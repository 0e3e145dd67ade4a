use axum::Router;

use crate::{evaluate, state::ApiState};

/// V1 API routes
pub fn routes() -> Router<ApiState> {
    Router::new().merge(evaluate::routes())
}
