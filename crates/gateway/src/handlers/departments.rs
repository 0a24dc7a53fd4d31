//! Department handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use patentdesk_common::{
    auth::AuthUser,
    db::models::Department,
    errors::Result,
    services::DepartmentRequest,
};
use uuid::Uuid;

use super::{ok, ApiResponse};
use crate::AppState;

pub async fn list_departments(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<Vec<Department>>>> {
    Ok(ok(state.services.departments.list().await?))
}

pub async fn create_department(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<DepartmentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Department>>)> {
    let department = state.services.departments.create(&user, request).await?;
    Ok((StatusCode::CREATED, ok(department)))
}

pub async fn update_department(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<DepartmentRequest>,
) -> Result<Json<ApiResponse<Department>>> {
    Ok(ok(state.services.departments.update(&user, id, request).await?))
}

pub async fn delete_department(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.services.departments.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
