//! Append-only activity log

use super::{Page, Repository};
use crate::db::models::*;
use crate::errors::Result;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, QueryOrder, Set};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct NewActivity {
    pub user_id: Option<Uuid>,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<String>,
    pub detail: Option<String>,
    pub ip_address: Option<String>,
}

impl Repository {
    pub async fn append_activity(&self, entry: NewActivity) -> Result<ActivityLog> {
        let row = ActivityLogActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(entry.user_id),
            action: Set(entry.action),
            target_type: Set(entry.target_type),
            target_id: Set(entry.target_id),
            detail: Set(entry.detail),
            ip_address: Set(entry.ip_address),
            created_at: Set(chrono::Utc::now().into()),
        };

        Ok(row.insert(self.conn()).await?)
    }

    /// Newest first
    pub async fn list_activity(&self, page: u64, per_page: u64) -> Result<Page<ActivityLog>> {
        let paginator = ActivityLogEntity::find()
            .order_by_desc(ActivityLogColumn::CreatedAt)
            .paginate(self.conn(), per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(Page::new(items, total, page, per_page))
    }
}
