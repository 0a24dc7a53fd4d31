//! Activity log listing

use axum::{
    extract::{Query, State},
    Json,
};
use patentdesk_common::{
    auth::AuthUser,
    db::{models::ActivityLog, Page},
    errors::Result,
};

use super::{ok, ApiResponse, Pagination};
use crate::AppState;

pub async fn list_activity(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ApiResponse<Page<ActivityLog>>>> {
    let page = state
        .services
        .activity
        .list(&user, pagination.page, pagination.per_page)
        .await?;
    Ok(ok(page))
}
