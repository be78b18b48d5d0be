mod handlers;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::core::state::AppState;

/// Routes nested under `/tests`.
pub(crate) fn test_router() -> Router<AppState> {
    Router::new()
        .route("/:test_id/start", post(handlers::start_attempt))
        .route("/:test_id/attempt", get(handlers::get_active_attempt))
}

/// Routes nested under `/attempts`.
pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_attempts))
        .route("/:attempt_id", get(handlers::get_attempt))
        .route("/:attempt_id/answers", post(handlers::save_answer))
        .route("/:attempt_id/submit", put(handlers::submit_attempt))
        .route("/:attempt_id/result", get(handlers::get_attempt_result))
}
