use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{state::AppState, workflow::ProxyError};

/// Error returned by handlers and services.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    /// Bad credentials. Deliberately says nothing about which half was wrong.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("Reset link is invalid or has expired")]
    InvalidToken,

    #[error("Too many requests, try again in {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Internal error text, attached to 500 responses and exposed only outside production.
#[derive(Debug, Clone)]
pub struct ErrorDetails(pub String);

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidToken => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Proxy(p) => p.status(),
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::Internal(err) => {
                error!(error = %format!("{err:#}"), "unhandled error");
                let mut res =
                    (status, Json(json!({ "error": "Internal server error" }))).into_response();
                res.extensions_mut().insert(ErrorDetails(format!("{err:#}")));
                res
            }
            AppError::Proxy(err) => {
                let body = match err.details() {
                    Some(details) => json!({ "error": err.to_string(), "details": details }),
                    None => json!({ "error": err.to_string() }),
                };
                (status, Json(body)).into_response()
            }
            AppError::RateLimited { retry_after } => {
                let msg = format!("Too many requests, try again in {retry_after} seconds");
                let mut res = (status, Json(json!({ "error": msg }))).into_response();
                if let Ok(v) = HeaderValue::from_str(&retry_after.to_string()) {
                    res.headers_mut().insert(header::RETRY_AFTER, v);
                }
                res
            }
            other => (status, Json(json!({ "error": other.to_string() }))).into_response(),
        }
    }
}

/// Rewrites generic 500 bodies to include the underlying error outside production.
pub async fn expose_error_details(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let mut res = next.run(req).await;
    let Some(ErrorDetails(details)) = res.extensions_mut().remove::<ErrorDetails>() else {
        return res;
    };
    if state.config.production {
        return res;
    }
    (
        res.status(),
        Json(json!({ "error": "Internal server error", "details": details })),
    )
        .into_response()
}
