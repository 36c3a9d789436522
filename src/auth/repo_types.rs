use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,                             // stored lowercased
    pub password_hash: String,                     // argon2 PHC string
    pub created_at: OffsetDateTime,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<OffsetDateTime>,
}

impl User {
    /// True while `token` is this user's reset token and has not expired.
    pub fn reset_token_is_live(&self, token: &str, now: OffsetDateTime) -> bool {
        match (&self.reset_token, self.reset_token_expiry) {
            (Some(stored), Some(expiry)) => stored == token && expiry > now,
            _ => false,
        }
    }
}

/// Validated input for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}
