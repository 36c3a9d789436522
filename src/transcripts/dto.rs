use serde::{Deserialize, Serialize};
use time::{format_description::FormatItem, macros::format_description};
use uuid::Uuid;

use super::repo_types::Transcript;

const CREATED_AT_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

#[derive(Debug, Deserialize)]
pub struct SubmitVideoRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// Transcript as the browser scripts read it: `video_url` and `created_at`
/// in snake case, content fields in camelCase.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptView {
    pub id: Uuid,
    pub video_url: String,
    #[serde(rename = "videoTitle")]
    pub video_title: Option<String>,
    pub introduction: Option<String>,
    pub summary: Option<String>,
    #[serde(rename = "mainPoints")]
    pub main_points: Option<String>,
    #[serde(rename = "fullContent")]
    pub full_content: Option<String>,
    pub created_at: String,
}

impl From<Transcript> for TranscriptView {
    fn from(t: Transcript) -> Self {
        Self {
            id: t.id,
            video_url: t.video_url,
            video_title: t.video_title,
            introduction: t.introduction,
            summary: t.summary,
            main_points: t.main_points,
            full_content: t.full_content,
            created_at: t.created_at.format(CREATED_AT_FORMAT).unwrap_or_default(),
        }
    }
}

/// Free-text answer that could not be stored as a transcript.
#[derive(Debug, Serialize)]
pub struct UnstructuredView {
    #[serde(rename = "fullContent")]
    pub full_content: String,
}
