use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::workflow::payload::NormalizedTranscript;

#[derive(Debug, Clone, FromRow)]
pub struct Transcript {
    pub id: Uuid,
    pub user_id: Uuid,
    pub video_url: String,
    pub video_title: Option<String>,
    pub introduction: Option<String>,
    pub summary: Option<String>,
    pub main_points: Option<String>,
    pub full_content: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewTranscript {
    pub user_id: Uuid,
    pub video_url: String,
    pub video_title: Option<String>,
    pub introduction: Option<String>,
    pub summary: Option<String>,
    pub main_points: Option<String>,
    pub full_content: Option<String>,
}

impl NewTranscript {
    pub fn from_normalized(user_id: Uuid, video_url: String, n: NormalizedTranscript) -> Self {
        Self {
            user_id,
            video_url,
            video_title: n.video_title,
            introduction: n.introduction,
            summary: n.summary,
            main_points: n.main_points,
            full_content: n.full_content,
        }
    }
}
