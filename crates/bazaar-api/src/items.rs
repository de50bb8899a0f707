use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use bazaar_types::ItemId;
use bazaar_types::api::{CreateItemRequest, ItemFilter, UpdateItemRequest};

use crate::error::ApiError;
use crate::{AppState, run_db};

pub async fn create_item(
    State(state): State<AppState>,
    Json(req): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let item = run_db(&state, move |db| db.create_item(req)).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn list_items(
    State(state): State<AppState>,
    Query(filter): Query<ItemFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let items = run_db(&state, move |db| db.list_items(&filter)).await?;
    Ok(Json(items))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<ItemId>,
) -> Result<impl IntoResponse, ApiError> {
    let item = run_db(&state, move |db| db.get_item(item_id)).await?;
    Ok(Json(item))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(item_id): Path<ItemId>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let item = run_db(&state, move |db| db.update_item(item_id, req)).await?;
    Ok(Json(item))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(item_id): Path<ItemId>,
) -> Result<impl IntoResponse, ApiError> {
    run_db(&state, move |db| db.delete_item(item_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::testing::{app, send};
    use axum::http::StatusCode;
    use serde_json::json;

    fn desk(transaction_type: &str) -> serde_json::Value {
        json!({
            "owner_id": "a1b2c3d4-e5f6-7890-1234-567890abcdef",
            "title": "Standing desk",
            "price_cents": 15000,
            "category": "furniture",
            "transaction_type": transaction_type
        })
    }

    #[tokio::test]
    async fn item_lifecycle() {
        let (_dir, app) = app();

        let (status, created) = send(&app, "POST", "/items", Some(desk("sale"))).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["item_id"].as_str().unwrap().to_string();

        let (status, patched) = send(
            &app,
            "PATCH",
            &format!("/items/{id}"),
            Some(json!({ "price_cents": 9000 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["price_cents"], 9000);
        assert_eq!(patched["title"], "Standing desk");

        let (status, _) = send(&app, "DELETE", &format!("/items/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, "GET", &format!("/items/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn list_filters_by_query() {
        let (_dir, app) = app();
        send(&app, "POST", "/items", Some(desk("sale"))).await;
        send(&app, "POST", "/items", Some(desk("rent"))).await;

        let (status, body) = send(&app, "GET", "/items?transaction_type=rent", None).await;
        assert_eq!(status, StatusCode::OK);
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["transaction_type"], "rent");

        let (_, body) = send(&app, "GET", "/items?category=books", None).await;
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_item_is_unprocessable() {
        let (_dir, app) = app();
        let mut body = desk("sale");
        body["title"] = json!("");
        let (status, body) = send(&app, "POST", "/items", Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn discussion_outlives_its_item() {
        let (_dir, app) = app();
        let (_, item) = send(&app, "POST", "/items", Some(desk("sale"))).await;
        let item_id = item["item_id"].as_str().unwrap().to_string();

        let (status, thread) = send(
            &app,
            "POST",
            "/threads",
            Some(json!({
                "author_id": "a1b2c3d4-e5f6-7890-1234-567890abcdef",
                "thread_type": "item_discussion",
                "item_id": item_id,
                "title": "Desk height?",
                "content": "How tall does it go?"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let thread_id = thread["thread_id"].as_str().unwrap().to_string();

        let (status, _) = send(&app, "DELETE", &format!("/items/{item_id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, thread) = send(&app, "GET", &format!("/threads/{thread_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(thread["item_id"], item_id.as_str());
    }

    #[tokio::test]
    async fn patch_null_clears_price() {
        let (_dir, app) = app();
        let (_, item) = send(&app, "POST", "/items", Some(desk("giveaway"))).await;
        let id = item["item_id"].as_str().unwrap().to_string();

        let (status, patched) = send(
            &app,
            "PATCH",
            &format!("/items/{id}"),
            Some(json!({ "price_cents": null })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(patched["price_cents"].is_null());
        assert_eq!(patched["title"], "Standing desk");
    }
}
