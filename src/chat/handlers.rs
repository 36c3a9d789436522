use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use super::services;
use crate::{auth::extractors::ApiJson, error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
}

/// POST /api/chat. Open to anonymous callers.
#[instrument(skip_all)]
pub async fn chat(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ChatRequest>,
) -> Result<Json<Value>, AppError> {
    let answer =
        services::send_message(&state, req.message.as_deref(), req.session_id.as_deref()).await?;
    Ok(Json(answer))
}
