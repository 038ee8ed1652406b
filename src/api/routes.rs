use crate::AppState;
use crate::api::handlers::{health, runs};
use axum::{
    Router,
    routing::{get, post},
};

/// Routes mounted under `/api`.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/runs", post(runs::create_run))
        .route("/runs/stream", post(runs::stream_run))
        .route("/runs/{id}", get(runs::get_run).delete(runs::delete_run))
        .route("/runs/{id}/cancel", post(runs::cancel_run))
        .route("/runs/{id}/events", get(runs::run_events))
}
