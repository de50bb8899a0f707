//! HTTP surface for the bazaar store. Handlers only translate between JSON
//! and `Database` operations; every rule lives in `bazaar-db`.

pub mod comments;
pub mod error;
pub mod items;
pub mod threads;
pub mod votes;

use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{get, patch, post, put},
};
use bazaar_db::Database;
use bazaar_types::BazaarError;
use serde_json::{Value, json};
use tracing::error;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/items", post(items::create_item).get(items::list_items))
        .route(
            "/items/{item_id}",
            get(items::get_item)
                .patch(items::update_item)
                .delete(items::delete_item),
        )
        .route("/threads", post(threads::create_thread).get(threads::list_threads))
        .route(
            "/threads/{thread_id}",
            get(threads::get_thread)
                .patch(threads::update_thread)
                .delete(threads::delete_thread),
        )
        .route(
            "/threads/{thread_id}/comments",
            post(comments::create_comment).get(comments::list_comments),
        )
        .route(
            "/threads/{thread_id}/comments/{comment_id}",
            patch(comments::update_comment).delete(comments::delete_comment),
        )
        .route(
            "/threads/{thread_id}/vote",
            put(votes::cast_or_update_vote).delete(votes::cancel_vote),
        )
        .route("/threads/{thread_id}/votes", get(votes::list_votes))
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Bazaar API." }))
}

/// Run a blocking store operation off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> bazaar_types::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError(BazaarError::Internal(e.to_string()))
        })?
        .map_err(ApiError)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use bazaar_db::DbConfig;
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;

    pub fn app() -> (TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("bazaar.db"), &DbConfig::default()).unwrap();
        let state: AppState = Arc::new(AppStateInner { db });
        (dir, router(state))
    }

    /// Send one request and return status plus body: parsed JSON, a plain
    /// string for non-JSON rejections, `Null` when empty.
    pub async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub fn chat_thread(author: &str) -> Value {
        json!({
            "author_id": author,
            "thread_type": "general_chat",
            "title": "Sofa?",
            "content": "Is it still available?"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn root_says_hello() {
        let (_dir, app) = app();
        let (status, body) = send(&app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].as_str().unwrap().contains("Bazaar"));
    }

    #[tokio::test]
    async fn malformed_id_is_rejected_before_reaching_the_store() {
        let (_dir, app) = app();
        let (status, _) = send(&app, "GET", "/threads/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
