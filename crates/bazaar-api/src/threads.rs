use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use bazaar_types::ThreadId;
use bazaar_types::api::{CreateThreadRequest, ThreadFilter, UpdateThreadRequest};

use crate::error::ApiError;
use crate::{AppState, run_db};

pub async fn create_thread(
    State(state): State<AppState>,
    Json(req): Json<CreateThreadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let thread = run_db(&state, move |db| db.create_thread(req)).await?;
    Ok((StatusCode::CREATED, Json(thread)))
}

pub async fn list_threads(
    State(state): State<AppState>,
    Query(filter): Query<ThreadFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let threads = run_db(&state, move |db| db.list_threads(&filter)).await?;
    Ok(Json(threads))
}

pub async fn get_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<ThreadId>,
) -> Result<impl IntoResponse, ApiError> {
    let thread = run_db(&state, move |db| db.get_thread(thread_id)).await?;
    Ok(Json(thread))
}

pub async fn update_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<ThreadId>,
    Json(req): Json<UpdateThreadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let thread = run_db(&state, move |db| db.update_thread(thread_id, req)).await?;
    Ok(Json(thread))
}

pub async fn delete_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<ThreadId>,
) -> Result<impl IntoResponse, ApiError> {
    run_db(&state, move |db| db.delete_thread(thread_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::testing::{app, chat_thread, send};
    use axum::http::StatusCode;
    use serde_json::json;

    const AUTHOR: &str = "a1b2c3d4-e5f6-7890-1234-567890abcdef";

    #[tokio::test]
    async fn create_returns_zeroed_aggregates() {
        let (_dir, app) = app();
        let (status, thread) = send(&app, "POST", "/threads", Some(chat_thread(AUTHOR))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(thread["comment_count"], 0);
        assert_eq!(thread["vote_score"], 0);
        assert_eq!(thread["is_active"], true);
        assert!(thread["item_id"].is_null());
    }

    #[tokio::test]
    async fn item_discussion_without_item_is_unprocessable() {
        let (_dir, app) = app();
        let mut body = chat_thread(AUTHOR);
        body["thread_type"] = json!("item_discussion");
        let (status, body) = send(&app, "POST", "/threads", Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn immutable_fields_cannot_be_patched() {
        let (_dir, app) = app();
        let (_, thread) = send(&app, "POST", "/threads", Some(chat_thread(AUTHOR))).await;
        let id = thread["thread_id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            "PATCH",
            &format!("/threads/{id}"),
            Some(json!({ "thread_type": "item_discussion" })),
        )
        .await;
        assert!(status.is_client_error());

        let (status, patched) = send(
            &app,
            "PATCH",
            &format!("/threads/{id}"),
            Some(json!({ "title": "Sofa still for sale?" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["title"], "Sofa still for sale?");
        assert_eq!(patched["thread_type"], "general_chat");
    }

    #[tokio::test]
    async fn list_and_delete() {
        let (_dir, app) = app();
        let (_, thread) = send(&app, "POST", "/threads", Some(chat_thread(AUTHOR))).await;
        let id = thread["thread_id"].as_str().unwrap().to_string();

        let (status, list) = send(&app, "GET", "/threads?thread_type=general_chat", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, _) = send(&app, "DELETE", &format!("/threads/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, "GET", &format!("/threads/{id}/comments"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
