//! Titles and their assignments

use super::patents::{insert_patent, NewPatent};
use super::Repository;
use crate::db::models::*;
use crate::errors::{AppError, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewTitle {
    pub title_no: String,
    pub name: String,
    pub data_type: String,
    pub department_id: Option<Uuid>,
    pub created_by: Uuid,
    pub view_permission: Option<String>,
    pub edit_permission: Option<String>,
    pub evaluation_enabled: bool,
    pub main_evaluation: bool,
    pub single_patent_multiple_evaluations: bool,
    pub parent_id: Option<Uuid>,
    pub save_date: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssignment {
    pub user_id: Uuid,
    pub permission: String,
    pub is_main_responsible: bool,
    pub notify_on_evaluation: bool,
    pub notify_on_update: bool,
    pub display_order: i32,
}

impl From<&TitleUser> for NewAssignment {
    fn from(row: &TitleUser) -> Self {
        Self {
            user_id: row.user_id,
            permission: row.permission.clone(),
            is_main_responsible: row.is_main_responsible,
            notify_on_evaluation: row.notify_on_evaluation,
            notify_on_update: row.notify_on_update,
            display_order: row.display_order,
        }
    }
}

/// A title written together with its assignments and patents
#[derive(Debug, Clone)]
pub struct TitleBundle {
    pub title: NewTitle,
    pub assignments: Vec<NewAssignment>,
    pub patents: Vec<NewPatent>,
}

async fn replace_assignments<C>(conn: &C, title_id: Uuid, assignments: &[NewAssignment]) -> Result<()>
where
    C: ConnectionTrait,
{
    TitleUserEntity::delete_many()
        .filter(TitleUserColumn::TitleId.eq(title_id))
        .exec(conn)
        .await?;

    if assignments.is_empty() {
        return Ok(());
    }

    let rows = assignments.iter().map(|a| TitleUserActiveModel {
        id: Set(Uuid::new_v4()),
        title_id: Set(title_id),
        user_id: Set(a.user_id),
        permission: Set(a.permission.clone()),
        is_main_responsible: Set(a.is_main_responsible),
        notify_on_evaluation: Set(a.notify_on_evaluation),
        notify_on_update: Set(a.notify_on_update),
        display_order: Set(a.display_order),
    });

    TitleUserEntity::insert_many(rows)
        .exec_without_returning(conn)
        .await?;

    Ok(())
}

impl Repository {
    // ========================================================================
    // Title Operations
    // ========================================================================

    pub async fn find_title(&self, id: Uuid) -> Result<Option<Title>> {
        Ok(TitleEntity::find_by_id(id).one(self.conn()).await?)
    }

    pub async fn find_titles(&self, ids: &[Uuid]) -> Result<Vec<Title>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(TitleEntity::find()
            .filter(TitleColumn::Id.is_in(ids.iter().copied()))
            .all(self.conn())
            .await?)
    }

    /// Titles newest first, optionally narrowed by a name / title_no term
    pub async fn list_titles(&self, search: Option<&str>) -> Result<Vec<Title>> {
        let mut query = TitleEntity::find();
        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(TitleColumn::Name.contains(term))
                    .add(TitleColumn::TitleNo.contains(term)),
            );
        }
        Ok(query
            .order_by_desc(TitleColumn::CreatedAt)
            .order_by_desc(TitleColumn::TitleNo)
            .all(self.conn())
            .await?)
    }

    /// title_no of the most recently created title
    pub async fn latest_title_no(&self) -> Result<Option<String>> {
        let latest = TitleEntity::find()
            .order_by_desc(TitleColumn::CreatedAt)
            .order_by_desc(TitleColumn::TitleNo)
            .one(self.conn())
            .await?;
        Ok(latest.map(|t| t.title_no))
    }

    pub async fn title_assignments(&self, title_id: Uuid) -> Result<Vec<TitleUser>> {
        Ok(TitleUserEntity::find()
            .filter(TitleUserColumn::TitleId.eq(title_id))
            .order_by_asc(TitleUserColumn::DisplayOrder)
            .all(self.conn())
            .await?)
    }

    pub async fn assignments_for_titles(&self, title_ids: &[Uuid]) -> Result<Vec<TitleUser>> {
        if title_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(TitleUserEntity::find()
            .filter(TitleUserColumn::TitleId.is_in(title_ids.iter().copied()))
            .order_by_asc(TitleUserColumn::DisplayOrder)
            .all(self.conn())
            .await?)
    }

    /// Every assignment row of one user
    pub async fn assignments_of_user(&self, user_id: Uuid) -> Result<Vec<TitleUser>> {
        Ok(TitleUserEntity::find()
            .filter(TitleUserColumn::UserId.eq(user_id))
            .all(self.conn())
            .await?)
    }

    /// Write a title with its assignments, patents and their classification
    /// rows in one transaction. Nothing is left behind if any insert fails.
    pub async fn insert_title_bundle(&self, bundle: TitleBundle) -> Result<(Title, usize)> {
        let now = chrono::Utc::now();
        let t = bundle.title;
        let title_no = t.title_no.clone();

        let txn = self.begin().await?;

        let title = TitleActiveModel {
            id: Set(Uuid::new_v4()),
            title_no: Set(t.title_no),
            name: Set(t.name),
            data_type: Set(t.data_type),
            department_id: Set(t.department_id),
            created_by: Set(t.created_by),
            view_permission: Set(t.view_permission),
            edit_permission: Set(t.edit_permission),
            evaluation_enabled: Set(t.evaluation_enabled),
            main_evaluation: Set(t.main_evaluation),
            single_patent_multiple_evaluations: Set(t.single_patent_multiple_evaluations),
            parent_id: Set(t.parent_id),
            save_date: Set(t.save_date),
            description: Set(t.description),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(|e| match e.sql_err() {
            // Two writers computed the same successor number
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::conflict(format!("Title number {title_no} is already taken"))
            }
            _ => e.into(),
        })?;

        replace_assignments(&txn, title.id, &bundle.assignments).await?;

        let mut inserted = 0;
        for patent in bundle.patents {
            insert_patent(&txn, title.id, patent).await?;
            inserted += 1;
        }

        txn.commit().await?;

        Ok((title, inserted))
    }

    /// Update title columns and, when given, replace the assignment list
    pub async fn update_title(
        &self,
        mut changes: TitleActiveModel,
        assignments: Option<Vec<NewAssignment>>,
    ) -> Result<Title> {
        changes.updated_at = Set(chrono::Utc::now().into());

        let txn = self.begin().await?;
        let title = changes.update(&txn).await?;
        if let Some(assignments) = assignments {
            replace_assignments(&txn, title.id, &assignments).await?;
        }
        txn.commit().await?;

        Ok(title)
    }

    /// Delete a title; rows below it cascade. Returns the attachments that
    /// were attached so their files can be removed.
    pub async fn delete_title(&self, id: Uuid) -> Result<Option<Vec<Attachment>>> {
        let txn = self.begin().await?;

        let attachments = AttachmentEntity::find()
            .filter(AttachmentColumn::TitleId.eq(id))
            .all(&txn)
            .await?;

        let result = TitleEntity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        txn.commit().await?;

        Ok(Some(attachments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbPool;
    use chrono::{TimeZone, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn title(no: &str) -> Title {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().into();
        Title {
            id: Uuid::new_v4(),
            title_no: no.to_string(),
            name: "watch list".to_string(),
            data_type: "patent".to_string(),
            department_id: None,
            created_by: Uuid::from_u128(1),
            view_permission: Some("all".to_string()),
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

    #[tokio::test]
    async fn test_latest_title_no() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![title("000041")], Vec::<Title>::new()])
            .into_connection();
        let repo = Repository::new(DbPool::from_connection(db));

        assert_eq!(repo.latest_title_no().await.unwrap().as_deref(), Some("000041"));
        assert_eq!(repo.latest_title_no().await.unwrap(), None);
    }

    #[test]
    fn test_assignment_from_row() {
        let row = TitleUser {
            id: Uuid::new_v4(),
            title_id: Uuid::from_u128(1),
            user_id: Uuid::from_u128(2),
            permission: "一般".to_string(),
            is_main_responsible: true,
            notify_on_evaluation: false,
            notify_on_update: true,
            display_order: 3,
        };
        let new = NewAssignment::from(&row);
        assert_eq!(new.user_id, row.user_id);
        assert!(new.is_main_responsible);
        assert_eq!(new.display_order, 3);
    }
}
