use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use tracing::{debug, info, instrument};

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, PublicUser,
            RegisterRequest, ResetPasswordRequest,
        },
        extractors::{AuthUser, ClientIp, PageUser, Payload},
        repo_types::User,
        services,
        session::{SessionKeys, SESSION_COOKIE},
    },
    error::AppError,
    pages, security,
    state::AppState,
};

const RESET_REQUESTED: &str = "If the email is registered, a password reset link has been sent";
const PASSWORD_CHANGED: &str = "Password changed. You can log in now";

/// Form flows show user-facing failures on the page itself; anything else
/// (rate limits, storage failures) goes out as the usual error response.
fn render_failure(err: AppError, render: impl FnOnce(&str) -> Html<String>) -> Response {
    match err {
        AppError::Validation(_) | AppError::InvalidCredentials | AppError::InvalidToken => {
            (err.status(), render(&err.to_string())).into_response()
        }
        other => other.into_response(),
    }
}

fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: &User,
    remember: bool,
) -> Result<CookieJar, AppError> {
    let keys = SessionKeys::from_ref(state);
    let issued = keys.issue(user.id, remember)?;
    Ok(jar.add(keys.cookie(&issued)))
}

pub async fn login_page(current: Option<PageUser>) -> Response {
    if current.is_some() {
        return Redirect::to("/").into_response();
    }
    pages::login("", None, None).into_response()
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    ClientIp(client): ClientIp,
    jar: CookieJar,
    payload: Payload<LoginRequest>,
) -> Result<Response, AppError> {
    state.limits.login.hit(&client)?;
    let Payload { body, json } = payload;

    let user = match services::login(&state, &body.email, &body.password, &client).await {
        Ok(u) => u,
        Err(e) if !json => {
            return Ok(render_failure(e, |msg| pages::login(&body.email, Some(msg), None)))
        }
        Err(e) => return Err(e),
    };

    let jar = start_session(&state, jar, &user, body.remember)?;
    if json {
        let res = AuthResponse {
            success: true,
            message: "Logged in",
            user: PublicUser::from(&user),
        };
        return Ok((jar, Json(res)).into_response());
    }
    Ok((jar, Redirect::to("/")).into_response())
}

pub async fn register_page(current: Option<PageUser>) -> Response {
    if current.is_some() {
        return Redirect::to("/").into_response();
    }
    pages::register("", "", None).into_response()
}

#[instrument(skip(state, jar, payload))]
pub async fn register(
    State(state): State<AppState>,
    ClientIp(client): ClientIp,
    jar: CookieJar,
    payload: Payload<RegisterRequest>,
) -> Result<Response, AppError> {
    state.limits.register.hit(&client)?;
    let Payload { body, json } = payload;

    let user = match services::register(&state, &body.username, &body.email, &body.password, &client)
        .await
    {
        Ok(u) => u,
        Err(e) if !json => {
            return Ok(render_failure(e, |msg| {
                pages::register(&body.username, &body.email, Some(msg))
            }))
        }
        Err(e) => return Err(e),
    };

    let jar = start_session(&state, jar, &user, false)?;
    if json {
        let res = AuthResponse {
            success: true,
            message: "Account created",
            user: PublicUser::from(&user),
        };
        return Ok((StatusCode::CREATED, jar, Json(res)).into_response());
    }
    Ok((jar, Redirect::to("/")).into_response())
}

/// Revoke the presented session, if any, and clear the cookie.
#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    ClientIp(client): ClientIp,
    jar: CookieJar,
) -> impl IntoResponse {
    let keys = SessionKeys::from_ref(&state);
    if let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_owned()) {
        match keys.verify(&token) {
            Ok(claims) => {
                state.sessions.revoke(&claims);
                security::logged_out(claims.sub, &client);
                info!(user_id = %claims.sub, "user logged out");
            }
            Err(e) => debug!(error = %e, "logout with unusable session cookie"),
        }
    }
    (jar.remove(keys.removal_cookie()), Redirect::to("/login"))
}

pub async fn forgot_password_page() -> Html<String> {
    pages::forgot_password(None, None)
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ClientIp(client): ClientIp,
    payload: Payload<ForgotPasswordRequest>,
) -> Result<Response, AppError> {
    state.limits.forgot_password.hit(&client)?;
    let Payload { body, json } = payload;

    match services::request_reset(&state, &body.email, &client).await {
        Ok(()) if json => Ok(Json(MessageResponse {
            success: true,
            message: RESET_REQUESTED,
        })
        .into_response()),
        Ok(()) => Ok(pages::forgot_password(None, Some(RESET_REQUESTED)).into_response()),
        Err(e) if !json => Ok(render_failure(e, |msg| pages::forgot_password(Some(msg), None))),
        Err(e) => Err(e),
    }
}

pub async fn reset_password_page(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    match services::check_reset(&state, &token).await {
        Ok(_) => Ok(pages::reset_password(&token, None).into_response()),
        Err(e) => Ok(render_failure(e, |msg| pages::reset_password(&token, Some(msg)))),
    }
}

#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    ClientIp(client): ClientIp,
    Path(token): Path<String>,
    payload: Payload<ResetPasswordRequest>,
) -> Result<Response, AppError> {
    let Payload { body, json } = payload;
    let res = services::consume_reset(
        &state,
        &token,
        &body.password,
        &body.confirm_password,
        &client,
    )
    .await;

    match res {
        Ok(()) if json => Ok(Json(MessageResponse {
            success: true,
            message: PASSWORD_CHANGED,
        })
        .into_response()),
        Ok(()) => Ok(pages::login("", None, Some(PASSWORD_CHANGED)).into_response()),
        Err(e) if !json => Ok(render_failure(e, |msg| pages::reset_password(&token, Some(msg)))),
        Err(e) => Err(e),
    }
}

pub async fn me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(PublicUser::from(&user))
}

#[instrument(skip_all)]
pub async fn profile(
    State(state): State<AppState>,
    PageUser(user): PageUser,
) -> Result<Html<String>, AppError> {
    let count = state.transcripts.list_for_user(user.id).await?.len();
    Ok(pages::profile(&user, count))
}
