//! Activity log recording and listing

use crate::auth::AuthUser;
use crate::db::models::ActivityLog;
use crate::db::{clamp_page, NewActivity, Page, Repository};
use crate::errors::Result;
use uuid::Uuid;

#[derive(Clone)]
pub struct ActivityService {
    repo: Repository,
}

impl ActivityService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Append one entry. The mutation being logged has already committed, so
    /// a failed append is logged and swallowed.
    pub async fn record(
        &self,
        user: Option<&AuthUser>,
        action: &str,
        target_type: &str,
        target_id: Option<Uuid>,
        detail: Option<String>,
    ) {
        let entry = NewActivity {
            user_id: user.map(AuthUser::id),
            action: action.to_string(),
            target_type: target_type.to_string(),
            target_id: target_id.map(|id| id.to_string()),
            detail,
            ip_address: user.and_then(|u| u.ip.clone()),
        };

        if let Err(e) = self.repo.append_activity(entry).await {
            tracing::error!(error = %e, action = action, target_type = target_type, "Failed to append activity log");
        }
    }

    /// Anonymous entry for events without an authenticated caller (login)
    pub async fn record_anonymous(&self, action: &str, user_id: Option<Uuid>, ip: Option<String>, detail: Option<String>) {
        let entry = NewActivity {
            user_id,
            action: action.to_string(),
            target_type: "user".to_string(),
            target_id: user_id.map(|id| id.to_string()),
            detail,
            ip_address: ip,
        };

        if let Err(e) = self.repo.append_activity(entry).await {
            tracing::error!(error = %e, action = action, "Failed to append activity log");
        }
    }

    /// Admin-only listing, newest first
    pub async fn list(&self, user: &AuthUser, page: Option<u64>, per_page: Option<u64>) -> Result<Page<ActivityLog>> {
        user.require_admin()?;
        let (page, per_page) = clamp_page(page, per_page);
        self.repo.list_activity(page, per_page).await
    }
}
