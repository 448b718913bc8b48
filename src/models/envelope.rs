use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

/// Uniform `{message, data}` body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub message: String,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }

    /// 200 with message "OK".
    pub fn ok(data: T) -> Response {
        (StatusCode::OK, Json(Self::new("OK", data))).into_response()
    }

    /// 201 with message "Created".
    pub fn created(data: T) -> Response {
        (StatusCode::CREATED, Json(Self::new("Created", data))).into_response()
    }
}

impl Envelope<serde_json::Value> {
    /// Error body; `data` is always an empty array.
    pub fn failure(status: StatusCode, message: impl Into<String>) -> Response {
        let mut message = message.into();
        if message.is_empty() {
            message = status
                .canonical_reason()
                .unwrap_or("Server Error")
                .to_string();
        }
        (status, Json(Self::new(message, json!([])))).into_response()
    }
}

/// 204 with an empty body.
pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
