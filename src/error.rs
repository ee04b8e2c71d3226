use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to generate suggestion")]
    Suggestion { details: String },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Suggestion { details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": self.to_string(), "details": details }),
            ),
            ApiError::MalformedPayload(_) => {
                (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() }))
            }
            ApiError::Store(StoreError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, json!({ "error": self.to_string() }))
            }
            ApiError::Store(StoreError::Invalid(fields)) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid session", "fields": fields }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
