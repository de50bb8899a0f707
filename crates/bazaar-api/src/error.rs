use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bazaar_types::BazaarError;
use serde_json::json;
use tracing::error;

/// Wraps a store failure so it can be returned from a handler.
#[derive(Debug)]
pub struct ApiError(pub BazaarError);

impl From<BazaarError> for ApiError {
    fn from(err: BazaarError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BazaarError::NotFound { .. } => StatusCode::NOT_FOUND,
            BazaarError::Validation(_) | BazaarError::InvalidReference(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            BazaarError::Conflict(_) => StatusCode::CONFLICT,
            BazaarError::ConcurrencyConflict(_) => StatusCode::SERVICE_UNAVAILABLE,
            BazaarError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let detail = match &self.0 {
            BazaarError::Internal(msg) => {
                error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(json!({ "error": self.0.kind(), "detail": detail })),
        )
            .into_response()
    }
}
