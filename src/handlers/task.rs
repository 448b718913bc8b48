use std::collections::HashMap;
use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use crate::errors::{AppError, AppResult};
use crate::models::{no_content, Envelope, TaskForm};
use crate::query::{self, ListQuery};
use crate::services::consistency;
use crate::state::AppState;
use super::payload::Payload;

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Response> {
    let query = ListQuery::from_params(&params, Some(state.config.query.default_task_limit))?;
    tracing::debug!("Listing tasks with {:?}", query);

    let tasks = state.store.list_tasks().await?;
    Ok(Envelope::ok(query.run(&tasks)?))
}

pub async fn create_task(
    State(state): State<AppState>,
    Payload(payload): Payload,
) -> AppResult<Response> {
    let form = TaskForm::for_create(&payload)?;
    let task = consistency::create_task(state.store.as_ref(), form).await?;
    Ok(Envelope::created(task))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Response> {
    let projection = query::projection_from_params(&params)?;
    let task = state
        .store
        .get_task(&task_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
    Ok(Envelope::ok(query::project(&task, projection.as_ref())?))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Payload(payload): Payload,
) -> AppResult<Response> {
    let form = TaskForm::for_update(&payload)?;
    let task = consistency::update_task(state.store.as_ref(), &task_id, form).await?;
    Ok(Envelope::ok(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<Response> {
    consistency::delete_task(state.store.as_ref(), &task_id).await?;
    Ok(no_content())
}
