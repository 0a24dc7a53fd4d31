//! Title access checks backed by the repository
//!
//! Loads the title snapshot, applies the evaluator from
//! [`crate::permission`] and turns the verdict into an error. A missing
//! title is `NotFound`; a denial is `Forbidden`.

use crate::auth::AuthUser;
use crate::db::models::{Title, TitleUser};
use crate::db::Repository;
use crate::errors::{AppError, Result};
use crate::permission::{can_view, AccessKind, TitleAccess};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone)]
pub struct AccessService {
    repo: Repository,
}

impl AccessService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    async fn load(&self, title_id: Uuid) -> Result<(Title, TitleAccess)> {
        let title = self
            .repo
            .find_title(title_id)
            .await?
            .ok_or_else(|| AppError::not_found("Title", title_id))?;
        let assignments = self.repo.title_assignments(title_id).await?;
        let access = TitleAccess::from_title(&title, &assignments);
        Ok((title, access))
    }

    /// Whether `user` has `kind` access to the title
    pub async fn check(&self, user: &AuthUser, title_id: Uuid, kind: AccessKind) -> Result<bool> {
        let (_, access) = self.load(title_id).await?;
        Ok(kind.check(&user.actor, &access))
    }

    /// The title, when `user` has `kind` access to it
    pub async fn ensure(&self, user: &AuthUser, title_id: Uuid, kind: AccessKind) -> Result<Title> {
        let (title, access) = self.load(title_id).await?;

        if !kind.check(&user.actor, &access) {
            tracing::warn!(
                user_id = %user.id(),
                title_id = %title_id,
                access = kind.as_str(),
                "Title access denied"
            );
            return Err(AppError::forbidden(format!(
                "no {} permission on title {}",
                kind.as_str(),
                title.title_no
            )));
        }

        Ok(title)
    }

    pub async fn ensure_view(&self, user: &AuthUser, title_id: Uuid) -> Result<Title> {
        self.ensure(user, title_id, AccessKind::View).await
    }

    pub async fn ensure_edit(&self, user: &AuthUser, title_id: Uuid) -> Result<Title> {
        self.ensure(user, title_id, AccessKind::Edit).await
    }

    pub async fn ensure_evaluate(&self, user: &AuthUser, title_id: Uuid) -> Result<Title> {
        self.ensure(user, title_id, AccessKind::Evaluate).await
    }

    pub async fn can_view(&self, user: &AuthUser, title_id: Uuid) -> Result<bool> {
        self.check(user, title_id, AccessKind::View).await
    }

    pub async fn can_edit(&self, user: &AuthUser, title_id: Uuid) -> Result<bool> {
        self.check(user, title_id, AccessKind::Edit).await
    }

    pub async fn can_evaluate(&self, user: &AuthUser, title_id: Uuid) -> Result<bool> {
        self.check(user, title_id, AccessKind::Evaluate).await
    }

    /// Titles `user` can view, newest first
    pub async fn viewable_titles(&self, user: &AuthUser, search: Option<&str>) -> Result<Vec<Title>> {
        let titles = self.repo.list_titles(search).await?;
        if user.is_admin() {
            return Ok(titles);
        }

        let own = self.repo.assignments_of_user(user.id()).await?;
        Ok(filter_viewable(titles, &own, user))
    }
}

/// Apply the view check to every title using only the actor's own
/// assignment rows; other users' rows cannot change the verdict.
fn filter_viewable(titles: Vec<Title>, own_assignments: &[TitleUser], user: &AuthUser) -> Vec<Title> {
    let mut by_title: HashMap<Uuid, Vec<TitleUser>> = HashMap::new();
    for row in own_assignments {
        by_title.entry(row.title_id).or_default().push(row.clone());
    }

    titles
        .into_iter()
        .filter(|title| {
            let rows = by_title.get(&title.id).map(Vec::as_slice).unwrap_or(&[]);
            can_view(&user.actor, &TitleAccess::from_title(title, rows))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::User;
    use crate::db::DbPool;
    use chrono::{TimeZone, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn user(id: u128, permission: &str) -> AuthUser {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().into();
        AuthUser::new(User {
            id: Uuid::from_u128(id),
            username: format!("user{}", id),
            display_name: format!("User {}", id),
            email: None,
            password_hash: String::new(),
            department_id: None,
            permission: permission.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    fn title(id: u128, view: &str) -> Title {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().into();
        Title {
            id: Uuid::from_u128(id),
            title_no: format!("{:06}", id),
            name: "t".to_string(),
            data_type: "patent".to_string(),
            department_id: None,
            created_by: Uuid::from_u128(1),
            view_permission: Some(view.to_string()),
            edit_permission: Some("creator".to_string()),
            evaluation_enabled: true,
            main_evaluation: false,
            single_patent_multiple_evaluations: false,
            parent_id: None,
            save_date: "2024/01".to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn assignment(title: u128, user: u128) -> TitleUser {
        TitleUser {
            id: Uuid::new_v4(),
            title_id: Uuid::from_u128(title),
            user_id: Uuid::from_u128(user),
            permission: "一般".to_string(),
            is_main_responsible: false,
            notify_on_evaluation: false,
            notify_on_update: false,
            display_order: 0,
        }
    }

    #[test]
    fn test_filter_viewable() {
        let titles = vec![title(10, "all"), title(11, "assigned"), title(12, "assigned"), title(13, "creator")];
        let me = user(7, "一般");
        let visible = filter_viewable(titles, &[assignment(12, 7)], &me);
        let ids: Vec<_> = visible.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![Uuid::from_u128(10), Uuid::from_u128(12)]);
    }

    #[tokio::test]
    async fn test_missing_title_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<Title>::new()])
            .into_connection();
        let access = AccessService::new(Repository::new(DbPool::from_connection(db)));

        let err = access.ensure_view(&user(7, "管理者"), Uuid::from_u128(99)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_denied_title_is_forbidden() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![title(11, "assigned")]])
            .append_query_results([vec![assignment(11, 8)]])
            .into_connection();
        let access = AccessService::new(Repository::new(DbPool::from_connection(db)));

        let err = access.ensure_view(&user(7, "一般"), Uuid::from_u128(11)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_assigned_user_may_view() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![title(11, "assigned")]])
            .append_query_results([vec![assignment(11, 7)]])
            .into_connection();
        let access = AccessService::new(Repository::new(DbPool::from_connection(db)));

        assert!(access.can_view(&user(7, "閲覧"), Uuid::from_u128(11)).await.unwrap());
    }
}
