//! Title handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use patentdesk_common::{
    auth::AuthUser,
    db::{models::Title, Page},
    errors::{AppError, Result},
    services::{
        CopyTitleRequest, CreateTitleRequest, MergeResult, MergeTitlesRequest, TitleDetail,
        UpdateTitleRequest,
    },
};
use serde::Deserialize;
use uuid::Uuid;

use super::{ok, ApiResponse};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleQuery {
    /// Matches title name or title number
    #[serde(alias = "search", alias = "keyword")]
    pub q: Option<String>,
    pub page: Option<u64>,
    #[serde(alias = "per_page")]
    pub per_page: Option<u64>,
}

impl TitleQuery {
    fn term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

pub async fn list_titles(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TitleQuery>,
) -> Result<Json<ApiResponse<Page<Title>>>> {
    let page = state
        .services
        .titles
        .list(&user, query.term(), query.page, query.per_page)
        .await?;
    Ok(ok(page))
}

pub async fn search_titles(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TitleQuery>,
) -> Result<Json<ApiResponse<Page<Title>>>> {
    let term = query.term().ok_or_else(|| AppError::Validation {
        message: "search term 'q' is required".to_string(),
        field: Some("q".to_string()),
    })?;

    tracing::debug!(user_id = %user.id(), term = %term, "Title search");

    let page = state
        .services
        .titles
        .list(&user, Some(term), query.page, query.per_page)
        .await?;
    Ok(ok(page))
}

pub async fn get_title(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TitleDetail>>> {
    Ok(ok(state.services.titles.get(&user, id).await?))
}

pub async fn create_title(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateTitleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TitleDetail>>)> {
    let title = state.services.titles.create(&user, request).await?;
    Ok((StatusCode::CREATED, ok(title)))
}

pub async fn update_title(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTitleRequest>,
) -> Result<Json<ApiResponse<TitleDetail>>> {
    Ok(ok(state.services.titles.update(&user, id, request).await?))
}

pub async fn delete_title(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.services.titles.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The body is optional; an empty request copies under a derived name
pub async fn copy_title(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    request: Option<Json<CopyTitleRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<TitleDetail>>)> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let title = state.services.titles.copy(&user, id, request).await?;
    Ok((StatusCode::CREATED, ok(title)))
}

pub async fn merge_titles(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<MergeTitlesRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MergeResult>>)> {
    let result = state.services.titles.merge(&user, request).await?;
    Ok((StatusCode::CREATED, ok(result)))
}
