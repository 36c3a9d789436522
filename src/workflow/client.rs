use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::{ChatInput, ProxyError, UpstreamReply, WorkflowClient};
use crate::config::WorkflowConfig;

const USER_AGENT: &str = concat!("tubescribe/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed [`WorkflowClient`]. Timeouts are per call, not per client,
/// because transcript processing runs minutes while chat replies take seconds.
#[derive(Clone)]
pub struct HttpWorkflowClient {
    http: reqwest::Client,
    config: WorkflowConfig,
}

impl HttpWorkflowClient {
    pub fn new(config: WorkflowConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("build workflow http client")?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl WorkflowClient for HttpWorkflowClient {
    #[instrument(skip(self))]
    async fn request_transcript(&self, video_url: &str) -> Result<UpstreamReply, ProxyError> {
        debug!(endpoint = %self.config.transcript_url, "calling transcript workflow");
        let res = self
            .http
            .get(&self.config.transcript_url)
            .query(&[("url", video_url)])
            .timeout(self.config.transcript_timeout())
            .send()
            .await
            .map_err(|e| send_error(e, "video processing"))?;
        read_reply(res, "video processing").await
    }

    #[instrument(skip(self, input), fields(session_id = %input.session_id))]
    async fn send_chat(&self, input: &ChatInput) -> Result<UpstreamReply, ProxyError> {
        debug!(endpoint = %self.config.chat_url, "calling chat workflow");
        let res = self
            .http
            .post(&self.config.chat_url)
            .json(input)
            .timeout(self.config.chat_timeout())
            .send()
            .await
            .map_err(|e| send_error(e, "chat reply"))?;
        read_reply(res, "chat reply").await
    }
}

async fn read_reply(res: reqwest::Response, what: &'static str) -> Result<UpstreamReply, ProxyError> {
    let status = res.status().as_u16();
    let body = res.text().await.map_err(|e| send_error(e, what))?;
    debug!(status, body_len = body.len(), "workflow replied");
    Ok(UpstreamReply { status, body })
}

fn send_error(e: reqwest::Error, what: &'static str) -> ProxyError {
    if e.is_timeout() {
        warn!(what, "workflow call timed out");
        ProxyError::Timeout(what)
    } else {
        warn!(error = %e, what, "workflow call failed");
        ProxyError::Transport(e.to_string())
    }
}
