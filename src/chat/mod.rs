pub mod handlers;
pub mod services;

use crate::state::AppState;
use axum::{routing::post, Router};

/// Mounted under `/api`.
pub fn api_router() -> Router<AppState> {
    Router::new().route("/chat", post(handlers::chat))
}
