use std::{convert::Infallible, net::SocketAddr};

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRef, FromRequest, FromRequestParts, Request},
    http::{header, request::Parts},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::CookieJar;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{
    repo_types::User,
    session::{SessionKeys, SESSION_COOKIE},
};
use crate::{error::AppError, state::AppState};

/// Signed-in user for JSON routes; rejects with 401.
pub struct AuthUser(pub User);

/// Signed-in user for page routes; redirects to `/login`.
pub struct PageUser(pub User);

/// Remote address of the client, `"unknown"` when the server was not started
/// with connect info.
pub struct ClientIp(pub String);

async fn resolve_session(parts: &Parts, state: &AppState) -> Result<User, AppError> {
    let jar = CookieJar::from_headers(&parts.headers);
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_owned())
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)?;

    let keys = SessionKeys::from_ref(state);
    let claims = keys.verify(&token).map_err(|e| {
        debug!(error = %e, "invalid or expired session");
        AppError::Unauthorized
    })?;

    if state.sessions.is_revoked(claims.sid) {
        debug!(sid = %claims.sid, "revoked session presented");
        return Err(AppError::Unauthorized);
    }

    state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or(AppError::Unauthorized)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve_session(parts, state).await.map(AuthUser)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for PageUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match resolve_session(parts, state).await {
            Ok(user) => Ok(PageUser(user)),
            Err(AppError::Unauthorized) => Err(Redirect::to("/login").into_response()),
            Err(e) => Err(e.into_response()),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".into());
        Ok(ClientIp(ip))
    }
}

/// JSON request body whose rejections (wrong content type, bad syntax,
/// wrong field types) come back as a 400 JSON validation error.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        Ok(ApiJson(body))
    }
}

/// Request body accepted either as JSON or as an HTML form. `json` tells the
/// handler which kind of response the client expects.
pub struct Payload<T> {
    pub body: T,
    pub json: bool,
}

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let ApiJson(body) = ApiJson::<T>::from_request(req, state).await?;
            Ok(Payload { body, json: true })
        } else {
            let Form(body) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            Ok(Payload { body, json: false })
        }
    }
}
