//! Shared fixtures for the integration tests: an in-process router backed by
//! `MemoryStore` and small request helpers.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;

use axum_taskboard::{
    config::Config,
    models::{Task, TaskForm, User, UserForm},
    routes,
    services::{consistency, MemoryStore},
    state::AppState,
};

pub fn test_config() -> Config {
    Config::local("redis://127.0.0.1:6379")
}

pub fn test_app_with(config: Config) -> (Router, MemoryStore) {
    let store = MemoryStore::new();
    let app = routes::app(AppState::new(Arc::new(store.clone()), config));
    (app, store)
}

pub fn test_app() -> (Router, MemoryStore) {
    test_app_with(test_config())
}

/// Sends a request and returns the status with the parsed JSON body
/// (`Value::Null` for an empty body).
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    read(app, request).await
}

pub async fn send_form(app: &Router, method: Method, uri: &str, form: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();

    read(app, request).await
}

async fn read(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub async fn create_user(store: &MemoryStore, name: &str, email: &str) -> User {
    let form = UserForm {
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        pending_tasks: None,
    };
    consistency::create_user(store, form).await.unwrap()
}

pub async fn create_task(store: &MemoryStore, name: &str, assignee: &str) -> Task {
    let form = TaskForm {
        name: Some(name.to_string()),
        deadline: Some(Utc::now()),
        assigned_user: Some(assignee.to_string()),
        ..TaskForm::default()
    };
    consistency::create_task(store, form).await.unwrap()
}

pub async fn pending_of(store: &MemoryStore, user_id: &str) -> Vec<String> {
    use axum_taskboard::services::EntityStore;
    store
        .get_user(user_id)
        .await
        .unwrap()
        .map(|user| user.pending_tasks)
        .unwrap_or_default()
}
