//! Evaluation handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use patentdesk_common::{
    auth::AuthUser,
    db::models::Evaluation,
    errors::Result,
    services::{BatchEvaluationRequest, CreateEvaluationRequest, UpdateEvaluationRequest},
};
use uuid::Uuid;

use super::{ok, ApiResponse};
use crate::AppState;

pub async fn list_for_patent(
    State(state): State<AppState>,
    user: AuthUser,
    Path(patent_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Evaluation>>>> {
    Ok(ok(state.services.evaluations.list_for_patent(&user, patent_id).await?))
}

pub async fn create_evaluation(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateEvaluationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Evaluation>>)> {
    let evaluation = state.services.evaluations.create(&user, request).await?;
    Ok((StatusCode::CREATED, ok(evaluation)))
}

pub async fn create_batch(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<BatchEvaluationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<Evaluation>>>)> {
    let evaluations = state.services.evaluations.create_batch(&user, request).await?;
    Ok((StatusCode::CREATED, ok(evaluations)))
}

pub async fn update_evaluation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateEvaluationRequest>,
) -> Result<Json<ApiResponse<Evaluation>>> {
    Ok(ok(state.services.evaluations.update(&user, id, request).await?))
}

pub async fn delete_evaluation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.services.evaluations.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
