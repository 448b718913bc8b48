use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};
use crate::errors::{AppError, StoreError};
use crate::models::Envelope;

// The IntoResponse trait implementation renders every AppError through the envelope.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(err) => {
                tracing::error!("Storage failure: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            AppError::Store(StoreError::Redis(e)) => format!("Database error: {}", e),
            other => other.to_string(),
        };

        Envelope::failure(status, message)
    }
}
