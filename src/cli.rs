use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    app,
    auth::{
        notifier::LogNotifier,
        repo::PgUserStore,
        services,
    },
    config::AppConfig,
    error::AppError,
    state::{self, AppState},
    transcripts::repo::PgTranscriptStore,
    workflow::HttpWorkflowClient,
};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Parser)]
#[command(name = "tubescribe")]
#[command(about = "YouTube transcript summaries behind user accounts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (default)
    Serve,
    /// Create an account without going through the web form
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        /// Read from the environment when omitted so it stays out of shell history
        #[arg(long, env = "TUBESCRIBE_NEW_USER_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

impl Cli {
    pub async fn run(self, config: AppConfig) -> Result<()> {
        match self.command.unwrap_or(Commands::Serve) {
            Commands::Serve => serve(config).await,
            Commands::CreateUser {
                username,
                email,
                password,
            } => create_user(config, &username, &email, &password).await,
        }
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    if config.session.ephemeral_secret {
        warn!("SECRET_KEY is not set; sessions will not survive a restart");
    }
    let state = AppState::init(config).await?;
    spawn_cleanup(state.clone());
    app::serve(app::build_app(state)).await
}

/// Periodically drop expired rate-limit windows and revocations.
fn spawn_cleanup(state: AppState) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            tick.tick().await;
            state.limits.cleanup();
            state.sessions.cleanup(OffsetDateTime::now_utc());
        }
    });
}

async fn create_user(config: AppConfig, username: &str, email: &str, password: &str) -> Result<()> {
    let config = Arc::new(config);
    let db = state::connect(&config).await?;
    let state = AppState::from_parts(
        config.clone(),
        Arc::new(PgUserStore::new(db.clone())),
        Arc::new(PgTranscriptStore::new(db)),
        Arc::new(HttpWorkflowClient::new(config.workflow.clone())?),
        Arc::new(LogNotifier {
            production: config.production,
        }),
    );

    match services::register(&state, username, email, password, "cli").await {
        Ok(user) => {
            info!(user_id = %user.id, username = %user.username, "user created");
            println!("created user {} <{}> ({})", user.username, user.email, user.id);
            Ok(())
        }
        Err(AppError::Validation(msg)) => bail!("cannot create user: {msg}"),
        Err(e) => Err(anyhow::anyhow!(e)),
    }
}
