//! Patent handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use patentdesk_common::{
    auth::AuthUser,
    db::{models::Patent, Page},
    errors::Result,
    fields::PatentFields,
    services::{CreatePatentRequest, PatentDetail, SetStatusRequest},
};
use serde::Deserialize;
use uuid::Uuid;

use super::{ok, ApiResponse};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatentQuery {
    #[serde(alias = "evaluation_status", alias = "evaluationStatus")]
    pub status: Option<String>,
    pub page: Option<u64>,
    #[serde(alias = "per_page")]
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitlePatentQuery {
    #[serde(alias = "title_id")]
    pub title_id: Uuid,
    #[serde(alias = "evaluation_status", alias = "evaluationStatus")]
    pub status: Option<String>,
    pub page: Option<u64>,
    #[serde(alias = "per_page")]
    pub per_page: Option<u64>,
}

/// `GET /titles/{id}/patents`
pub async fn list_title_patents(
    State(state): State<AppState>,
    user: AuthUser,
    Path(title_id): Path<Uuid>,
    Query(query): Query<PatentQuery>,
) -> Result<Json<ApiResponse<Page<Patent>>>> {
    let page = state
        .services
        .patents
        .list(&user, title_id, query.status.as_deref(), query.page, query.per_page)
        .await?;
    Ok(ok(page))
}

/// `GET /patents?title_id=`
pub async fn list_patents(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TitlePatentQuery>,
) -> Result<Json<ApiResponse<Page<Patent>>>> {
    let page = state
        .services
        .patents
        .list(&user, query.title_id, query.status.as_deref(), query.page, query.per_page)
        .await?;
    Ok(ok(page))
}

pub async fn get_patent(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PatentDetail>>> {
    Ok(ok(state.services.patents.get(&user, id).await?))
}

pub async fn create_patent(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreatePatentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Patent>>)> {
    let patent = state.services.patents.create(&user, request).await?;
    Ok((StatusCode::CREATED, ok(patent)))
}

pub async fn update_patent(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(fields): Json<PatentFields>,
) -> Result<Json<ApiResponse<Patent>>> {
    Ok(ok(state.services.patents.update(&user, id, fields).await?))
}

pub async fn set_patent_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SetStatusRequest>,
) -> Result<Json<ApiResponse<Patent>>> {
    Ok(ok(state.services.patents.set_status(&user, id, request).await?))
}

pub async fn delete_patent(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.services.patents.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /patents/companies/{name}/patents`
pub async fn company_patents(
    State(state): State<AppState>,
    user: AuthUser,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<Vec<Patent>>>> {
    Ok(ok(state.services.patents.search_by_company(&user, &name).await?))
}
