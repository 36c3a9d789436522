use std::{ops::RangeInclusive, time::Duration};

use rand::{rngs::OsRng, RngCore};
use serde::Deserialize;

const SESSION_TTL_MINUTES: RangeInclusive<i64> = 1..=7 * 24 * 60;
const REMEMBER_TTL_DAYS: RangeInclusive<i64> = 1..=365;
const RESET_TOKEN_TTL_MINUTES: RangeInclusive<i64> = 1..=24 * 60;
const TIMEOUT_SECS: RangeInclusive<u64> = 1..=3600;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub remember_ttl_days: i64,
    /// No `SECRET_KEY` was configured; a random one is used for this process.
    #[serde(default)]
    pub ephemeral_secret: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    pub transcript_url: String,
    pub chat_url: String,
    pub transcript_timeout_secs: u64,
    pub chat_timeout_secs: u64,
}

impl WorkflowConfig {
    pub fn transcript_timeout(&self) -> Duration {
        Duration::from_secs(self.transcript_timeout_secs)
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// `APP_ENV=production` turns on secure cookies, HSTS and quiet reset links.
    pub production: bool,
    pub public_base_url: String,
    pub reset_token_ttl_minutes: i64,
    pub allowed_origins: Vec<String>,
    pub security_log_path: String,
    pub session: SessionConfig,
    pub workflow: WorkflowConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let production = std::env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let (secret, ephemeral_secret) = match std::env::var("SECRET_KEY") {
            Ok(s) if !s.is_empty() => (s, false),
            _ => (random_secret(), true),
        };

        let session = SessionConfig {
            secret,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "tubescribe".into()),
            audience: std::env::var("SESSION_AUDIENCE")
                .unwrap_or_else(|_| "tubescribe-web".into()),
            ttl_minutes: env_bounded("SESSION_TTL_MINUTES", 60, SESSION_TTL_MINUTES),
            remember_ttl_days: env_bounded("REMEMBER_TTL_DAYS", 30, REMEMBER_TTL_DAYS),
            ephemeral_secret,
        };

        let workflow = WorkflowConfig {
            transcript_url: std::env::var("WORKFLOW_WEBHOOK_URL")
                .unwrap_or_else(|_| "http://localhost:5678/webhook/youtube_text".into()),
            chat_url: std::env::var("CHAT_WEBHOOK_URL")
                .unwrap_or_else(|_| "http://localhost:5678/webhook/chat".into()),
            transcript_timeout_secs: env_bounded("WORKFLOW_TIMEOUT_SECS", 300, TIMEOUT_SECS),
            chat_timeout_secs: env_bounded("CHAT_TIMEOUT_SECS", 60, TIMEOUT_SECS),
        };

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:8080,http://127.0.0.1:8080".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database_url,
            production,
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into())
                .trim_end_matches('/')
                .to_string(),
            reset_token_ttl_minutes: env_bounded(
                "RESET_TOKEN_TTL_MINUTES",
                60,
                RESET_TOKEN_TTL_MINUTES,
            ),
            allowed_origins,
            security_log_path: std::env::var("SECURITY_LOG_PATH")
                .unwrap_or_else(|_| "security.log".into()),
            session,
            workflow,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Like `env_parse`, clamped into `range` so later duration arithmetic
/// cannot overflow.
fn env_bounded<T: std::str::FromStr + Ord + Copy>(
    key: &str,
    default: T,
    range: RangeInclusive<T>,
) -> T {
    env_parse(key, default).clamp(*range.start(), *range.end())
}

fn random_secret() -> String {
    let mut buf = [0u8; 32];
    OsRng.fill_bytes(&mut buf);
    buf.iter().map(|b| format!("{b:02x}")).collect()
}
