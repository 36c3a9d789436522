//! In-memory stand-ins for the database, workflow service and notifier, plus
//! request helpers for router tests.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::FromRef,
    http::{header, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    app::build_app,
    auth::{
        notifier::ResetNotifier,
        repo::{CreateUserError, UserStore},
        repo_types::{NewUser, User},
        services,
        session::{SessionKeys, SESSION_COOKIE},
    },
    config::{AppConfig, SessionConfig, WorkflowConfig},
    state::AppState,
    transcripts::{
        repo::TranscriptStore,
        repo_types::{NewTranscript, Transcript},
    },
    workflow::{ChatInput, ProxyError, UpstreamReply, WorkflowClient},
};

pub const TEST_PASSWORD: &str = "secret1";

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
    duplicate_next: AtomicBool,
}

impl MemoryUserStore {
    /// Make the next `create` fail as if another request inserted the same
    /// email first.
    pub fn fail_next_create_with_duplicate_email(&self) {
        self.duplicate_next.store(true, Ordering::SeqCst);
    }

    fn find(&self, pred: impl Fn(&User) -> bool) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| pred(u)).cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.find(|u| u.id == id))
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.find(|u| u.email == email))
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        Ok(self.find(|u| u.username == username))
    }

    async fn find_by_reset_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        Ok(self.find(|u| u.reset_token.as_deref() == Some(token)))
    }

    async fn create(&self, new: NewUser) -> Result<User, CreateUserError> {
        if self.duplicate_next.swap(false, Ordering::SeqCst) {
            return Err(CreateUserError::EmailTaken);
        }
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == new.email) {
            return Err(CreateUserError::EmailTaken);
        }
        if users.iter().any(|u| u.username == new.username) {
            return Err(CreateUserError::UsernameTaken);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            created_at: OffsetDateTime::now_utc(),
            reset_token: None,
            reset_token_expiry: None,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        let mut users = self.users.lock().unwrap();
        if let Some(u) = users.iter_mut().find(|u| u.id == user_id) {
            u.reset_token = Some(token.to_owned());
            u.reset_token_expiry = Some(expires_at);
        }
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<Uuid>> {
        let mut users = self.users.lock().unwrap();
        let Some(u) = users.iter_mut().find(|u| u.reset_token_is_live(token, now)) else {
            return Ok(None);
        };
        u.password_hash = password_hash.to_owned();
        u.reset_token = None;
        u.reset_token_expiry = None;
        Ok(Some(u.id))
    }
}

#[derive(Default)]
pub struct MemoryTranscriptStore {
    rows: Mutex<Vec<Transcript>>,
}

impl MemoryTranscriptStore {
    pub fn is_empty(&self) -> bool {
        self.rows.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl TranscriptStore for MemoryTranscriptStore {
    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Transcript>> {
        let mut rows: Vec<Transcript> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        // insertion order breaks ties within the same instant
        rows.reverse();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn get_for_user(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Transcript>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id && t.user_id == user_id)
            .cloned())
    }

    async fn create(&self, new: NewTranscript) -> anyhow::Result<Transcript> {
        let t = Transcript {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            video_url: new.video_url,
            video_title: new.video_title,
            introduction: new.introduction,
            summary: new.summary,
            main_points: new.main_points,
            full_content: new.full_content,
            created_at: OffsetDateTime::now_utc(),
        };
        self.rows.lock().unwrap().push(t.clone());
        Ok(t)
    }
}

type Queued = Mutex<VecDeque<Result<UpstreamReply, ProxyError>>>;

/// Workflow service that answers from queued replies and records every call.
#[derive(Default)]
pub struct FakeWorkflow {
    transcript_replies: Queued,
    chat_replies: Queued,
    transcript_calls: Mutex<Vec<String>>,
    chat_calls: Mutex<Vec<ChatInput>>,
}

impl FakeWorkflow {
    pub fn reply_transcript(&self, status: u16, body: &str) {
        self.transcript_replies.lock().unwrap().push_back(Ok(UpstreamReply {
            status,
            body: body.to_owned(),
        }));
    }

    pub fn fail_transcript(&self, err: ProxyError) {
        self.transcript_replies.lock().unwrap().push_back(Err(err));
    }

    pub fn reply_chat(&self, status: u16, body: &str) {
        self.chat_replies.lock().unwrap().push_back(Ok(UpstreamReply {
            status,
            body: body.to_owned(),
        }));
    }

    pub fn fail_chat(&self, err: ProxyError) {
        self.chat_replies.lock().unwrap().push_back(Err(err));
    }

    pub fn transcript_calls(&self) -> Vec<String> {
        self.transcript_calls.lock().unwrap().clone()
    }

    pub fn chat_calls(&self) -> Vec<ChatInput> {
        self.chat_calls.lock().unwrap().clone()
    }
}

fn next_reply(queue: &Queued) -> Result<UpstreamReply, ProxyError> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(ProxyError::Transport("no reply queued".into())))
}

#[async_trait]
impl WorkflowClient for FakeWorkflow {
    async fn request_transcript(&self, video_url: &str) -> Result<UpstreamReply, ProxyError> {
        self.transcript_calls.lock().unwrap().push(video_url.to_owned());
        next_reply(&self.transcript_replies)
    }

    async fn send_chat(&self, input: &ChatInput) -> Result<UpstreamReply, ProxyError> {
        self.chat_calls.lock().unwrap().push(input.clone());
        next_reply(&self.chat_replies)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    links: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Token part of the most recent reset link.
    pub fn last_token(&self) -> Option<String> {
        let links = self.links.lock().unwrap();
        links
            .last()
            .and_then(|l| l.rsplit_once("/reset-password/"))
            .map(|(_, token)| token.to_owned())
    }
}

#[async_trait]
impl ResetNotifier for RecordingNotifier {
    async fn send_reset_link(&self, _user: &User, link: &str) -> anyhow::Result<()> {
        self.links.lock().unwrap().push(link.to_owned());
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub users: Arc<MemoryUserStore>,
    pub transcripts: Arc<MemoryTranscriptStore>,
    pub workflow: Arc<FakeWorkflow>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config(false))
    }

    pub fn production() -> Self {
        Self::with_config(test_config(true))
    }

    fn with_config(config: AppConfig) -> Self {
        let users = Arc::new(MemoryUserStore::default());
        let transcripts = Arc::new(MemoryTranscriptStore::default());
        let workflow = Arc::new(FakeWorkflow::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::from_parts(
            Arc::new(config),
            users.clone(),
            transcripts.clone(),
            workflow.clone(),
            notifier.clone(),
        );
        Self {
            state,
            users,
            transcripts,
            workflow,
            notifier,
        }
    }

    pub fn router(&self) -> Router {
        build_app(self.state.clone())
    }

    /// Register `<name>@example.com` with [`TEST_PASSWORD`] and return it
    /// with a ready-to-send `Cookie` header value.
    pub async fn signed_in(&self, name: &str) -> (User, String) {
        let user = services::register(
            &self.state,
            name,
            &format!("{name}@example.com"),
            TEST_PASSWORD,
            "test",
        )
        .await
        .expect("register test user");
        let issued = SessionKeys::from_ref(&self.state)
            .issue(user.id, false)
            .expect("issue session");
        (user, format!("{SESSION_COOKIE}={}", issued.token))
    }
}

fn test_config(production: bool) -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".into(),
        production,
        public_base_url: "http://localhost:8080".into(),
        reset_token_ttl_minutes: 60,
        allowed_origins: vec!["http://localhost:8080".into()],
        security_log_path: "security.log".into(),
        session: SessionConfig {
            secret: "test-secret".into(),
            issuer: "tubescribe".into(),
            audience: "tubescribe-web".into(),
            ttl_minutes: 60,
            remember_ttl_days: 30,
            ephemeral_secret: false,
        },
        workflow: WorkflowConfig {
            transcript_url: "http://127.0.0.1:9/transcript".into(),
            chat_url: "http://127.0.0.1:9/chat".into(),
            transcript_timeout_secs: 5,
            chat_timeout_secs: 5,
        },
    }
}

pub async fn body_json(res: Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(res: Response) -> String {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn json_post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

pub fn with_cookie(mut req: Request<Body>, cookie: &str) -> Request<Body> {
    req.headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    req
}

/// `name=value` of the session cookie set by `res`, usable as a `Cookie` header.
pub fn session_cookie(res: &Response) -> Option<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with(&format!("{SESSION_COOKIE}=")))
        .map(str::to_owned)
}
