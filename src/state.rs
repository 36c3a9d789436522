use crate::auth::{
    notifier::{LogNotifier, ResetNotifier},
    repo::{PgUserStore, UserStore},
    session::SessionRegistry,
};
use crate::config::AppConfig;
use crate::rate_limit::RateLimits;
use crate::transcripts::repo::{PgTranscriptStore, TranscriptStore};
use crate::workflow::{HttpWorkflowClient, WorkflowClient};
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub transcripts: Arc<dyn TranscriptStore>,
    pub workflow: Arc<dyn WorkflowClient>,
    pub notifier: Arc<dyn ResetNotifier>,
    pub sessions: Arc<SessionRegistry>,
    pub limits: Arc<RateLimits>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let db = connect(&config).await?;

        let workflow = Arc::new(HttpWorkflowClient::new(config.workflow.clone())?)
            as Arc<dyn WorkflowClient>;
        let notifier = Arc::new(LogNotifier {
            production: config.production,
        }) as Arc<dyn ResetNotifier>;

        Ok(Self::from_parts(
            config,
            Arc::new(PgUserStore::new(db.clone())),
            Arc::new(PgTranscriptStore::new(db)),
            workflow,
            notifier,
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        transcripts: Arc<dyn TranscriptStore>,
        workflow: Arc<dyn WorkflowClient>,
        notifier: Arc<dyn ResetNotifier>,
    ) -> Self {
        Self {
            config,
            users,
            transcripts,
            workflow,
            notifier,
            sessions: Arc::new(SessionRegistry::default()),
            limits: Arc::new(RateLimits::default()),
        }
    }
}

/// Open the pool and bring the schema up to date.
pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let db = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;
    Ok(db)
}
