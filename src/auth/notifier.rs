use async_trait::async_trait;
use tracing::info;

use crate::auth::repo_types::User;

/// Delivers password-reset links to users.
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn send_reset_link(&self, user: &User, link: &str) -> anyhow::Result<()>;
}

/// Writes reset links to the log instead of mailing them. The link itself is
/// only logged outside production.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    pub production: bool,
}

#[async_trait]
impl ResetNotifier for LogNotifier {
    async fn send_reset_link(&self, user: &User, link: &str) -> anyhow::Result<()> {
        if self.production {
            info!(target: "security", user_id = %user.id, "password reset link issued");
        } else {
            info!(target: "security", user_id = %user.id, email = %user.email, %link, "password reset link issued");
        }
        Ok(())
    }
}
