use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};

use crate::{
    error::AppError,
    state::AppState,
    workflow::{unwrap_first, ChatInput, ProxyError, CHAT_EXCERPT_CHARS},
};

/// Session id used when the client did not send one. Second resolution, so
/// two anonymous clients in the same second share a conversation.
pub(crate) fn fallback_session_id(now: OffsetDateTime) -> String {
    format!("session-{}", now.unix_timestamp())
}

/// Relay one chat message and hand back the workflow's JSON answer.
#[instrument(skip(state, message))]
pub async fn send_message(
    state: &AppState,
    message: Option<&str>,
    session_id: Option<&str>,
) -> Result<Value, AppError> {
    let message = message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| AppError::validation("Message is required"))?;

    let session_id = session_id
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| fallback_session_id(OffsetDateTime::now_utc()));

    let input = ChatInput {
        chat_input: message.to_owned(),
        session_id,
    };
    let reply = state.workflow.send_chat(&input).await?;
    let body = reply.into_ok_body(CHAT_EXCERPT_CHARS).map_err(|e| {
        warn!(error = %e, "chat workflow failed");
        e
    })?;

    let value: Value = serde_json::from_str(&body).map_err(|e| {
        debug!(error = %e, "chat reply is not JSON");
        ProxyError::Malformed(format!("chat reply is not JSON: {e}"))
    })?;
    Ok(unwrap_first(value))
}
