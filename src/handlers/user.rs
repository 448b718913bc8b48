use std::collections::HashMap;
use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use crate::errors::{AppError, AppResult};
use crate::models::{no_content, Envelope, UserForm};
use crate::query::{self, ListQuery};
use crate::services::consistency;
use crate::state::AppState;
use super::payload::Payload;

// Users are listed without a default limit.
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Response> {
    let query = ListQuery::from_params(&params, None)?;
    let users = state.store.list_users().await?;
    Ok(Envelope::ok(query.run(&users)?))
}

pub async fn create_user(
    State(state): State<AppState>,
    Payload(payload): Payload,
) -> AppResult<Response> {
    let form = UserForm::for_create(&payload)?;
    let user = consistency::create_user(state.store.as_ref(), form).await?;
    Ok(Envelope::created(user))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Response> {
    let projection = query::projection_from_params(&params)?;
    let user = state
        .store
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Envelope::ok(query::project(&user, projection.as_ref())?))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Payload(payload): Payload,
) -> AppResult<Response> {
    let form = UserForm::for_update(&payload)?;
    let user = consistency::update_user(state.store.as_ref(), &user_id, form).await?;
    Ok(Envelope::ok(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Response> {
    consistency::delete_user(state.store.as_ref(), &user_id).await?;
    Ok(no_content())
}
