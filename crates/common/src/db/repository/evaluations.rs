//! Evaluations and patent-status mirroring

use super::Repository;
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::evaluation::{ensure_can_submit, mirrored_status};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewEvaluation {
    pub patent_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub comment: Option<String>,
    pub score: Option<i32>,
    pub is_public: bool,
}

async fn active_for_patent<C>(conn: &C, patent_id: Uuid) -> Result<Vec<Evaluation>>
where
    C: ConnectionTrait,
{
    Ok(EvaluationEntity::find()
        .filter(EvaluationColumn::PatentId.eq(patent_id))
        .filter(EvaluationColumn::State.eq(EvaluationState::Active.as_str()))
        .order_by_asc(EvaluationColumn::CreatedAt)
        .all(conn)
        .await?)
}

/// Recompute the patent's evaluation_status from its active evaluations
async fn sync_patent_status<C>(conn: &C, title: &Title, patent_id: Uuid) -> Result<()>
where
    C: ConnectionTrait,
{
    if !title.main_evaluation {
        return Ok(());
    }

    let active = active_for_patent(conn, patent_id).await?;
    let Some(status) = mirrored_status(title, &active) else {
        return Ok(());
    };

    let patent = PatentEntity::find_by_id(patent_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Patent", patent_id))?;

    if patent.evaluation_status != status {
        let mut active: PatentActiveModel = patent.into();
        active.evaluation_status = Set(status);
        active.updated_at = Set(chrono::Utc::now().into());
        active.update(conn).await?;
    }

    Ok(())
}

async fn insert_evaluation<C>(conn: &C, title: &Title, new: NewEvaluation) -> Result<Evaluation>
where
    C: ConnectionTrait,
{
    // Row lock serialises concurrent submissions for the same patent
    PatentEntity::find_by_id(new.patent_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Patent", new.patent_id))?;

    let existing = active_for_patent(conn, new.patent_id).await?;
    ensure_can_submit(title, &existing, new.user_id, new.patent_id)?;

    let now = chrono::Utc::now();
    let evaluation = EvaluationActiveModel {
        id: Set(Uuid::new_v4()),
        patent_id: Set(new.patent_id),
        title_id: Set(title.id),
        user_id: Set(new.user_id),
        status: Set(new.status),
        comment: Set(new.comment),
        score: Set(new.score),
        is_public: Set(new.is_public),
        state: Set(EvaluationState::Active.into()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(conn)
    .await?;

    sync_patent_status(conn, title, evaluation.patent_id).await?;

    Ok(evaluation)
}

impl Repository {
    // ========================================================================
    // Evaluation Operations
    // ========================================================================

    pub async fn find_evaluation(&self, id: Uuid) -> Result<Option<Evaluation>> {
        Ok(EvaluationEntity::find_by_id(id).one(self.conn()).await?)
    }

    pub async fn active_evaluations_for_patent(&self, patent_id: Uuid) -> Result<Vec<Evaluation>> {
        active_for_patent(self.conn(), patent_id).await
    }

    pub async fn active_evaluations_for_patents(&self, patent_ids: &[Uuid]) -> Result<Vec<Evaluation>> {
        if patent_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(EvaluationEntity::find()
            .filter(EvaluationColumn::PatentId.is_in(patent_ids.iter().copied()))
            .filter(EvaluationColumn::State.eq(EvaluationState::Active.as_str()))
            .order_by_asc(EvaluationColumn::CreatedAt)
            .all(self.conn())
            .await?)
    }

    /// Multiplicity is checked inside the same transaction as the insert
    pub async fn create_evaluation(&self, title: &Title, new: NewEvaluation) -> Result<Evaluation> {
        let txn = self.begin().await?;
        let evaluation = insert_evaluation(&txn, title, new).await?;
        txn.commit().await?;
        Ok(evaluation)
    }

    /// All or nothing: the first rejected patent rolls the batch back
    pub async fn create_evaluations(&self, title: &Title, batch: Vec<NewEvaluation>) -> Result<Vec<Evaluation>> {
        let txn = self.begin().await?;

        let mut created = Vec::with_capacity(batch.len());
        for new in batch {
            created.push(insert_evaluation(&txn, title, new).await?);
        }

        txn.commit().await?;

        Ok(created)
    }

    pub async fn update_evaluation(&self, title: &Title, mut changes: EvaluationActiveModel) -> Result<Evaluation> {
        changes.updated_at = Set(chrono::Utc::now().into());

        let txn = self.begin().await?;
        let evaluation = changes.update(&txn).await?;
        sync_patent_status(&txn, title, evaluation.patent_id).await?;
        txn.commit().await?;

        Ok(evaluation)
    }

    /// Mark deleted and recompute the mirrored patent status
    pub async fn soft_delete_evaluation(&self, title: &Title, evaluation: Evaluation) -> Result<Evaluation> {
        let patent_id = evaluation.patent_id;
        let mut active: EvaluationActiveModel = evaluation.into();
        active.state = Set(EvaluationState::Deleted.into());
        active.updated_at = Set(chrono::Utc::now().into());

        let txn = self.begin().await?;
        let deleted = active.update(&txn).await?;
        sync_patent_status(&txn, title, patent_id).await?;
        txn.commit().await?;

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbPool;
    use chrono::{TimeZone, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn title() -> Title {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().into();
        Title {
            id: Uuid::from_u128(1),
            title_no: "000001".to_string(),
            name: "t".to_string(),
            data_type: "patent".to_string(),
            department_id: None,
            created_by: Uuid::from_u128(1),
            view_permission: Some("all".to_string()),
            edit_permission: Some("all".to_string()),
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

    fn patent() -> Patent {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().into();
        Patent {
            id: Uuid::from_u128(20),
            title_id: Uuid::from_u128(1),
            patent_no: Some("P-100".to_string()),
            application_no: None,
            application_date: None,
            publication_no: None,
            publication_date: None,
            registration_no: None,
            registration_date: None,
            invention_title: None,
            applicant: None,
            inventor: None,
            ipc: None,
            abstract_text: None,
            claims: None,
            legal_status: None,
            evaluation_status: STATUS_UNEVALUATED.to_string(),
            memo: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn evaluation(user: u128) -> Evaluation {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().into();
        Evaluation {
            id: Uuid::from_u128(50),
            patent_id: Uuid::from_u128(20),
            title_id: Uuid::from_u128(1),
            user_id: Uuid::from_u128(user),
            status: "重要".to_string(),
            comment: None,
            score: None,
            is_public: true,
            state: EvaluationState::Active.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn new_evaluation(user: u128) -> NewEvaluation {
        NewEvaluation {
            patent_id: Uuid::from_u128(20),
            user_id: Uuid::from_u128(user),
            status: "重要".to_string(),
            comment: None,
            score: None,
            is_public: true,
        }
    }

    #[tokio::test]
    async fn test_patent_row_locked_before_multiplicity_check() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![patent()]])
            .append_query_results([Vec::<Evaluation>::new()])
            .append_query_results([vec![evaluation(7)]])
            .into_connection();
        let repo = Repository::new(DbPool::from_connection(db));

        let created = repo.create_evaluation(&title(), new_evaluation(7)).await.unwrap();
        assert_eq!(created.user_id, Uuid::from_u128(7));

        let conn = Arc::try_unwrap(repo.pool.conn).unwrap();
        let log = format!("{:?}", conn.into_transaction_log());
        let lock = log.find("FOR UPDATE").expect("patent row is locked");
        let read = log.find(r#"\"state\""#).expect("active evaluations are read");
        assert!(lock < read);
    }

    #[tokio::test]
    async fn test_second_active_evaluation_conflicts() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![patent()]])
            .append_query_results([vec![evaluation(7)]])
            .into_connection();
        let repo = Repository::new(DbPool::from_connection(db));

        let err = tokio_test::assert_err!(repo.create_evaluation(&title(), new_evaluation(7)).await);
        assert!(matches!(err, AppError::Conflict { .. }));
    }
}
