use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use bazaar_types::api::{CreateCommentRequest, UpdateCommentRequest};
use bazaar_types::{CommentId, ThreadId};

use crate::error::ApiError;
use crate::{AppState, run_db};

pub async fn create_comment(
    State(state): State<AppState>,
    Path(thread_id): Path<ThreadId>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = run_db(&state, move |db| db.create_comment(thread_id, req)).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(thread_id): Path<ThreadId>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = run_db(&state, move |db| db.list_comments_for_thread(thread_id)).await?;
    Ok(Json(comments))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Path((thread_id, comment_id)): Path<(ThreadId, CommentId)>,
    Json(req): Json<UpdateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = run_db(&state, move |db| db.update_comment(thread_id, comment_id, req)).await?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path((thread_id, comment_id)): Path<(ThreadId, CommentId)>,
) -> Result<impl IntoResponse, ApiError> {
    run_db(&state, move |db| db.delete_comment(thread_id, comment_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
