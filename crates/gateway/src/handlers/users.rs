//! User administration handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use patentdesk_common::{
    auth::AuthUser,
    db::models::User,
    errors::Result,
    services::{CreateUserRequest, UpdateUserRequest},
};
use uuid::Uuid;

use super::{ok, ApiResponse};
use crate::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<Vec<User>>>> {
    Ok(ok(state.services.users.list().await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<User>>)> {
    let created = state.services.users.create(&user, request).await?;
    Ok((StatusCode::CREATED, ok(created)))
}

pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<User>>> {
    Ok(ok(state.services.users.update(&user, id, request).await?))
}

/// Accounts are deactivated rather than removed
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<User>>> {
    Ok(ok(state.services.users.deactivate(&user, id).await?))
}
