use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use time::{Duration, OffsetDateTime};
use tracing::{error, info, instrument, warn};

use super::{
    password::{self, MIN_PASSWORD_LEN},
    repo::CreateUserError,
    repo_types::{NewUser, User},
};
use crate::{error::AppError, security, state::AppState};

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=50;
const MAX_EMAIL_LEN: usize = 120;
const RESET_TOKEN_BYTES: usize = 32;

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn validate_username(username: &str) -> Result<(), AppError> {
    if !USERNAME_LEN.contains(&username.chars().count()) {
        return Err(AppError::validation("Username must be between 3 and 50 characters"));
    }
    Ok(())
}

pub(crate) fn validate_email(email: &str) -> Result<(), AppError> {
    if email.is_empty() || !email.contains('@') || email.chars().count() > MAX_EMAIL_LEN {
        return Err(AppError::validation("Invalid email address"));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation("Password must be at least 6 characters"));
    }
    Ok(())
}

/// 32 bytes from the OS RNG, URL-safe base64 without padding.
pub(crate) fn generate_reset_token() -> String {
    let mut buf = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut buf);
    Base64UrlUnpadded::encode_string(&buf)
}

#[instrument(skip(state, password))]
pub async fn register(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
    client: &str,
) -> Result<User, AppError> {
    let username = username.trim();
    let email = normalize_email(email);

    validate_username(username)?;
    validate_email(&email)?;
    validate_password(password)?;

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::validation(CreateUserError::EmailTaken.to_string()));
    }
    if state.users.find_by_username(username).await?.is_some() {
        warn!(username, "username already taken");
        return Err(AppError::validation(CreateUserError::UsernameTaken.to_string()));
    }

    let password_hash = password::hash(password.to_owned()).await?;
    let new = NewUser {
        username: username.to_owned(),
        email,
        password_hash,
    };

    let user = match state.users.create(new).await {
        Ok(u) => u,
        Err(e @ (CreateUserError::EmailTaken | CreateUserError::UsernameTaken)) => {
            warn!(error = %e, "duplicate account lost insert race");
            return Err(AppError::validation(e.to_string()));
        }
        Err(CreateUserError::Other(e)) => {
            error!(error = %e, "create user failed");
            return Err(AppError::Internal(e));
        }
    };

    info!(user_id = %user.id, "user registered");
    security::registered(user.id, &user.email, client);
    Ok(user)
}

/// Check credentials. Unknown emails and wrong passwords fail identically.
#[instrument(skip(state, password))]
pub async fn login(
    state: &AppState,
    email: &str,
    password: &str,
    client: &str,
) -> Result<User, AppError> {
    let email = normalize_email(email);
    let user = if email.is_empty() {
        None
    } else {
        state.users.find_by_email(&email).await?
    };

    let ok = password::verify(password.to_owned(), user.as_ref().map(|u| u.password_hash.clone()))
        .await?;

    match user {
        Some(user) if ok => {
            info!(user_id = %user.id, "user logged in");
            security::login_succeeded(user.id, &email, client);
            Ok(user)
        }
        _ => {
            security::login_failed(&email, client);
            Err(AppError::InvalidCredentials)
        }
    }
}

/// Issue a reset token when the email belongs to an account. Callers answer
/// the same way whether or not it did.
#[instrument(skip(state))]
pub async fn request_reset(state: &AppState, email: &str, client: &str) -> Result<(), AppError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(AppError::validation("Email is required"));
    }

    let Some(user) = state.users.find_by_email(&email).await? else {
        security::reset_requested(&email, false, client);
        return Ok(());
    };

    let token = generate_reset_token();
    let expires_at =
        OffsetDateTime::now_utc() + Duration::minutes(state.config.reset_token_ttl_minutes);
    state.users.set_reset_token(user.id, &token, expires_at).await?;
    security::reset_requested(&email, true, client);

    let link = format!("{}/reset-password/{}", state.config.public_base_url, token);
    if let Err(e) = state.notifier.send_reset_link(&user, &link).await {
        error!(error = %e, user_id = %user.id, "reset link delivery failed");
    }
    Ok(())
}

/// The user holding `token`, if the token is still live.
pub async fn check_reset(state: &AppState, token: &str) -> Result<User, AppError> {
    let user = state
        .users
        .find_by_reset_token(token)
        .await?
        .ok_or(AppError::InvalidToken)?;
    if !user.reset_token_is_live(token, OffsetDateTime::now_utc()) {
        return Err(AppError::InvalidToken);
    }
    Ok(user)
}

#[instrument(skip_all)]
pub async fn consume_reset(
    state: &AppState,
    token: &str,
    new_password: &str,
    confirm_password: &str,
    client: &str,
) -> Result<(), AppError> {
    if let Err(e) = check_reset(state, token).await {
        if matches!(e, AppError::InvalidToken) {
            security::reset_rejected(client);
        }
        return Err(e);
    }
    validate_password(new_password)?;
    if new_password != confirm_password {
        return Err(AppError::validation("Passwords do not match"));
    }

    let password_hash = password::hash(new_password.to_owned()).await?;
    let consumed = state
        .users
        .consume_reset_token(token, &password_hash, OffsetDateTime::now_utc())
        .await?;

    match consumed {
        Some(user_id) => {
            info!(%user_id, "password reset");
            security::reset_completed(user_id, client);
            Ok(())
        }
        None => {
            security::reset_rejected(client);
            Err(AppError::InvalidToken)
        }
    }
}
