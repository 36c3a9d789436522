use std::{fs::OpenOptions, sync::Mutex};

use anyhow::Context;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::{
    filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

mod app;
mod auth;
mod chat;
mod cli;
mod config;
mod error;
mod pages;
mod rate_limit;
mod security;
mod state;
mod transcripts;
mod workflow;

#[cfg(test)]
mod testing;

use crate::{cli::Cli, config::AppConfig, security::SECURITY_TARGET};

const DEFAULT_LOG_FILTER: &str = "tubescribe=debug,axum=info,tower_http=info,security=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    init_tracing(&config)?;
    cli.run(config).await
}

/// Console output filtered by `RUST_LOG`, plus the append-only security log.
fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    let console = if json_logs {
        fmt::layer()
            .with_target(false)
            .json()
            .with_filter(env_filter)
            .boxed()
    } else {
        fmt::layer().with_filter(env_filter).boxed()
    };

    let security_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.security_log_path)
        .with_context(|| format!("open security log {}", config.security_log_path))?;
    let security = fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(security_file))
        .with_filter(Targets::new().with_target(SECURITY_TARGET, Level::INFO));

    tracing_subscriber::registry()
        .with(console)
        .with(security)
        .init();
    Ok(())
}
