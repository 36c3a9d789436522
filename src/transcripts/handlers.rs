use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{SubmitVideoRequest, TranscriptView, UnstructuredView},
    services::{self, Submission},
};
use crate::{
    auth::extractors::{ApiJson, AuthUser, PageUser},
    error::AppError,
    pages,
    state::AppState,
};

// --- routers ---

pub fn page_router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/my-files", get(my_files))
}

/// Mounted under `/api`.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/my-transcripts", get(list_transcripts))
        .route("/transcript", post(submit_transcript))
        .route("/transcript/:id", get(get_transcript))
}

// --- handlers ---

pub async fn index(PageUser(user): PageUser) -> Html<String> {
    pages::index(&user)
}

#[instrument(skip_all)]
pub async fn my_files(
    State(state): State<AppState>,
    PageUser(user): PageUser,
) -> Result<Html<String>, AppError> {
    let views: Vec<TranscriptView> = services::list(&state, user.id)
        .await?
        .into_iter()
        .map(TranscriptView::from)
        .collect();
    Ok(pages::my_files(&user, &views))
}

#[instrument(skip_all)]
pub async fn list_transcripts(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<TranscriptView>>, AppError> {
    let items = services::list(&state, user.id)
        .await?
        .into_iter()
        .map(TranscriptView::from)
        .collect();
    Ok(Json(items))
}

#[instrument(skip(state, user))]
pub async fn get_transcript(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TranscriptView>, AppError> {
    let transcript = services::get(&state, user.id, &id).await?;
    Ok(Json(transcript.into()))
}

/// POST /api/transcript
#[instrument(skip_all)]
pub async fn submit_transcript(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<SubmitVideoRequest>,
) -> Result<Response, AppError> {
    match services::submit_video(&state, user.id, req.url.as_deref()).await? {
        Submission::Stored(t) => Ok(Json(TranscriptView::from(t)).into_response()),
        Submission::Unstructured { full_content } => {
            Ok(Json(UnstructuredView { full_content }).into_response())
        }
    }
}
