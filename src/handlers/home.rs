use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use crate::models::Envelope;
use crate::state::AppState;

pub async fn service_info() -> Response {
    let data = json!({
        "endpoints": {
            "users": "/api/users",
            "tasks": "/api/tasks",
            "home": "/api/",
        },
        "documentation": "REST API for managing users and the tasks assigned to them",
    });
    Json(Envelope::new("Welcome to the task board API", data)).into_response()
}

/// Reports whether a connection token is configured, never its value.
pub async fn api_home(State(state): State<AppState>) -> Response {
    let configured = state
        .config
        .token
        .as_deref()
        .is_some_and(|token| !token.trim().is_empty());
    let status = if configured { "Set" } else { "Not set" };
    Envelope::ok(json!({ "connectionString": status }))
}

pub async fn not_found() -> Response {
    Envelope::failure(StatusCode::NOT_FOUND, "Not Found")
}
