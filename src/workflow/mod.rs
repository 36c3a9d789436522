//! Client side of the external workflow service (n8n-style webhooks).
//!
//! The service is reached through [`WorkflowClient`] so handlers never touch
//! reqwest directly; [`payload`] turns whatever the transcript webhook returns
//! into a fixed record.

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub mod client;
pub mod payload;

pub use client::HttpWorkflowClient;

/// Longest upstream body excerpt carried by a transcript error.
pub const TRANSCRIPT_EXCERPT_CHARS: usize = 500;
/// Longest upstream body excerpt carried by a chat error.
pub const CHAT_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("workflow service returned status {status}")]
    Upstream { status: u16, details: String },

    #[error("Request timeout - {0} took too long")]
    Timeout(&'static str),

    #[error(
        "workflow started but returned no data; the webhook must respond when the workflow finishes"
    )]
    WorkflowNotCompleted,

    #[error("unexpected response from workflow service: {0}")]
    Malformed(String),

    #[error("could not reach workflow service")]
    Transport(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::WorkflowNotCompleted => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Upstream { .. } | ProxyError::Malformed(_) | ProxyError::Transport(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            ProxyError::Upstream { details, .. } => Some(details),
            _ => None,
        }
    }
}

/// Raw answer from a webhook: status code and body text.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: String,
}

impl UpstreamReply {
    /// Body of a 200 reply; anything else becomes [`ProxyError::Upstream`].
    pub fn into_ok_body(self, excerpt_chars: usize) -> Result<String, ProxyError> {
        if self.status != 200 {
            return Err(ProxyError::Upstream {
                status: self.status,
                details: excerpt(&self.body, excerpt_chars),
            });
        }
        Ok(self.body)
    }
}

/// Body posted to the chat webhook.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatInput {
    pub chat_input: String,
    pub session_id: String,
}

#[async_trait]
pub trait WorkflowClient: Send + Sync {
    /// GET the transcript webhook with `?url=<video_url>`.
    async fn request_transcript(&self, video_url: &str) -> Result<UpstreamReply, ProxyError>;
    /// POST a chat message as JSON.
    async fn send_chat(&self, input: &ChatInput) -> Result<UpstreamReply, ProxyError>;
}

/// First `max` characters of `body`, never splitting a UTF-8 sequence.
pub fn excerpt(body: &str, max: usize) -> String {
    body.chars().take(max).collect()
}

/// Webhooks sometimes wrap their answer in a one-element array.
pub fn unwrap_first(value: Value) -> Value {
    match value {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        other => other,
    }
}
