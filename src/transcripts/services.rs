use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::repo_types::{NewTranscript, Transcript};
use crate::{
    error::AppError,
    state::AppState,
    workflow::{
        payload::{parse_reply, WorkflowReply},
        TRANSCRIPT_EXCERPT_CHARS,
    },
};

pub const MAX_VIDEO_URL_LEN: usize = 500;

lazy_static! {
    static ref YOUTUBE_URL_RE: Regex =
        Regex::new(r"^(https?://)?(www\.)?(youtube\.com|youtu\.be)/.+").unwrap();
}

/// Outcome of a successful workflow round trip.
#[derive(Debug)]
pub enum Submission {
    Stored(Transcript),
    /// The workflow answered with plain text; nothing was saved.
    Unstructured { full_content: String },
}

pub fn validate_video_url(url: Option<&str>) -> Result<&str, AppError> {
    let url = url.map(str::trim).filter(|u| !u.is_empty());
    let Some(url) = url else {
        return Err(AppError::validation("URL is required"));
    };
    if url.chars().count() > MAX_VIDEO_URL_LEN {
        return Err(AppError::validation("URL is too long"));
    }
    if !YOUTUBE_URL_RE.is_match(url) {
        return Err(AppError::validation("Invalid YouTube URL"));
    }
    Ok(url)
}

/// Send `url` through the transcript workflow and store the result for `user_id`.
/// Blocks until the workflow answers or the configured timeout passes.
#[instrument(skip(state))]
pub async fn submit_video(
    state: &AppState,
    user_id: Uuid,
    url: Option<&str>,
) -> Result<Submission, AppError> {
    let url = validate_video_url(url)?;

    let reply = state.workflow.request_transcript(url).await?;
    let body = reply.into_ok_body(TRANSCRIPT_EXCERPT_CHARS).map_err(|e| {
        warn!(error = %e, "transcript workflow failed");
        e
    })?;

    match parse_reply(&body)? {
        WorkflowReply::Unstructured(full_content) => {
            info!("workflow answered with plain text; not stored");
            Ok(Submission::Unstructured { full_content })
        }
        WorkflowReply::Structured(payload) => {
            let new = NewTranscript::from_normalized(user_id, url.to_owned(), payload.normalize());
            let transcript = state.transcripts.create(new).await?;
            info!(transcript_id = %transcript.id, "transcript stored");
            Ok(Submission::Stored(transcript))
        }
    }
}

pub async fn list(state: &AppState, user_id: Uuid) -> Result<Vec<Transcript>, AppError> {
    Ok(state.transcripts.list_for_user(user_id).await?)
}

/// A transcript owned by `user_id`. Ids that do not parse, do not exist, or
/// belong to someone else are all reported as not found.
pub async fn get(state: &AppState, user_id: Uuid, raw_id: &str) -> Result<Transcript, AppError> {
    let not_found = || AppError::NotFound("Transcript not found".into());
    let id = Uuid::parse_str(raw_id).map_err(|_| not_found())?;
    state
        .transcripts
        .get_for_user(user_id, id)
        .await?
        .ok_or_else(not_found)
}
