use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, created_at, reset_token, reset_token_expiry";

#[derive(Debug, Error)]
pub enum CreateUserError {
    #[error("Email already registered")]
    EmailTaken,
    #[error("Username already taken")]
    UsernameTaken,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Persistence for user accounts and their reset tokens.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_reset_token(&self, token: &str) -> anyhow::Result<Option<User>>;

    /// Insert a user. Uniqueness is enforced by the store, so a racing
    /// duplicate comes back as `EmailTaken`/`UsernameTaken`.
    async fn create(&self, new: NewUser) -> Result<User, CreateUserError>;

    /// Replace any previous reset token of the user.
    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()>;

    /// Set a new password and clear the token in one step, but only while the
    /// token is still live at `now`. Returns the user id when it was consumed.
    async fn consume_reset_token(
        &self,
        token: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<Uuid>>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_one(&self, column: &str, value: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await
            .with_context(|| format!("find user by {column}"))?;
        Ok(user)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.find_one("email", email).await
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        self.find_one("username", username).await
    }

    async fn find_by_reset_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        self.find_one("reset_token", token).await
    }

    async fn create(&self, new: NewUser) -> Result<User, CreateUserError> {
        let sql = format!(
            "INSERT INTO users (id, username, email, password_hash) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        );
        let res = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.username)
            .bind(&new.email)
            .bind(&new.password_hash)
            .fetch_one(&self.db)
            .await;

        match res {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
                match db_err.constraint() {
                    Some("users_username_key") => Err(CreateUserError::UsernameTaken),
                    _ => Err(CreateUserError::EmailTaken),
                }
            }
            Err(e) => Err(CreateUserError::Other(anyhow::Error::new(e).context("insert user"))),
        }
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET reset_token = $2, reset_token_expiry = $3
             WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .context("store reset token")?;
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<Uuid>> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE users
               SET password_hash = $2, reset_token = NULL, reset_token_expiry = NULL
             WHERE reset_token = $1 AND reset_token_expiry > $3
            RETURNING id
            "#,
        )
        .bind(token)
        .bind(password_hash)
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .context("consume reset token")?;
        Ok(row.map(|(id,)| id))
    }
}

#[cfg(all(test, feature = "postgres-tests"))]
mod pg_tests {
    use super::*;
    use time::Duration;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password_hash: "hash".into(),
        }
    }

    #[sqlx::test]
    async fn duplicate_username_and_email_map_by_constraint(pool: PgPool) {
        let store = PgUserStore::new(pool);
        store.create(new_user("alice", "alice@example.com")).await.unwrap();

        let err = store
            .create(new_user("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, CreateUserError::UsernameTaken));

        let err = store
            .create(new_user("bob", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, CreateUserError::EmailTaken));
    }

    #[sqlx::test]
    async fn reset_token_is_consumed_once_and_only_while_live(pool: PgPool) {
        let store = PgUserStore::new(pool);
        let user = store.create(new_user("alice", "alice@example.com")).await.unwrap();
        let now = OffsetDateTime::now_utc();

        store
            .set_reset_token(user.id, "live", now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(
            store.consume_reset_token("live", "new-hash", now).await.unwrap(),
            Some(user.id)
        );
        assert_eq!(store.consume_reset_token("live", "again", now).await.unwrap(), None);

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new-hash");
        assert!(stored.reset_token.is_none());
        assert!(stored.reset_token_expiry.is_none());

        store
            .set_reset_token(user.id, "stale", now - Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(store.consume_reset_token("stale", "x", now).await.unwrap(), None);
        let stored = store.find_by_reset_token("stale").await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new-hash");
    }
}
