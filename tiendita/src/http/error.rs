use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid data")]
    Validation { details: String },
    #[error("user not found")]
    UserNotFound,
    #[error("product not found")]
    ProductNotFound,
    #[error("no products registered")]
    NoProducts,
    #[error("invalid credentials")]
    Unauthorized,
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::UserNotFound | ApiError::ProductNotFound | ApiError::NoProducts => {
                StatusCode::NOT_FOUND
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::Validation { details } => {
                Json(serde_json::json!({ "message": self.to_string(), "details": details }))
            }
            _ => Json(serde_json::json!({ "message": self.to_string() })),
        };
        (self.status(), body).into_response()
    }
}

/// Store failures become an opaque 500; the underlying error is logged and
/// never placed in the response body.
impl From<StoreError> for ApiError {
    fn from(source: StoreError) -> Self {
        error!(error = %source, "store operation failed");
        ApiError::Internal
    }
}
