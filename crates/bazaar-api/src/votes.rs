use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use bazaar_types::ThreadId;
use bazaar_types::api::{CancelVoteRequest, CastVoteRequest};

use crate::error::ApiError;
use crate::{AppState, run_db};

/// PUT /threads/{thread_id}/vote: upsert the caller's vote, return the thread.
pub async fn cast_or_update_vote(
    State(state): State<AppState>,
    Path(thread_id): Path<ThreadId>,
    Json(req): Json<CastVoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let thread = run_db(&state, move |db| {
        db.cast_or_update_vote(thread_id, req.user_id, req.direction)
    })
    .await?;
    Ok(Json(thread))
}

/// DELETE /threads/{thread_id}/vote: the user id travels in the body until
/// callers are authenticated upstream.
pub async fn cancel_vote(
    State(state): State<AppState>,
    Path(thread_id): Path<ThreadId>,
    Json(req): Json<CancelVoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let thread = run_db(&state, move |db| db.cancel_vote(thread_id, req.user_id)).await?;
    Ok(Json(thread))
}

pub async fn list_votes(
    State(state): State<AppState>,
    Path(thread_id): Path<ThreadId>,
) -> Result<impl IntoResponse, ApiError> {
    let votes = run_db(&state, move |db| db.list_votes(thread_id)).await?;
    Ok(Json(votes))
}
