//! Evaluation submission, listing and soft delete

use super::access::AccessService;
use super::activity::ActivityService;
use crate::auth::AuthUser;
use crate::db::models::{Evaluation, EvaluationActiveModel, Patent};
use crate::db::{NewEvaluation, Repository};
use crate::errors::{AppError, Result};
use crate::evaluation::{ensure_owner, visible_to};
use crate::merge::distinct_ids;
use sea_orm::Set;
use serde::Deserialize;
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

pub const MAX_BATCH_SIZE: usize = 1000;

fn default_public() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvaluationRequest {
    #[serde(alias = "patent_id")]
    pub patent_id: Uuid,

    #[validate(length(min = 1, max = 50))]
    pub status: String,

    #[validate(length(max = 5000))]
    pub comment: Option<String>,

    #[validate(range(min = 0, max = 100))]
    pub score: Option<i32>,

    #[serde(default = "default_public", alias = "is_public")]
    pub is_public: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BatchEvaluationRequest {
    #[serde(alias = "title_id")]
    pub title_id: Uuid,

    #[validate(length(min = 1, max = 1000))]
    #[serde(alias = "patent_ids")]
    pub patent_ids: Vec<Uuid>,

    #[validate(length(min = 1, max = 50))]
    pub status: String,

    #[validate(length(max = 5000))]
    pub comment: Option<String>,

    #[serde(default = "default_public", alias = "is_public")]
    pub is_public: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEvaluationRequest {
    #[validate(length(min = 1, max = 50))]
    pub status: Option<String>,

    #[validate(length(max = 5000))]
    pub comment: Option<String>,

    #[validate(range(min = 0, max = 100))]
    pub score: Option<i32>,

    #[serde(alias = "is_public")]
    pub is_public: Option<bool>,
}

#[derive(Clone)]
pub struct EvaluationService {
    repo: Repository,
    access: AccessService,
    activity: ActivityService,
}

impl EvaluationService {
    pub fn new(repo: Repository, access: AccessService, activity: ActivityService) -> Self {
        Self { repo, access, activity }
    }

    async fn find_patent(&self, id: Uuid) -> Result<Patent> {
        self.repo
            .find_patent(id)
            .await?
            .ok_or_else(|| AppError::not_found("Patent", id))
    }

    async fn find_active(&self, id: Uuid) -> Result<Evaluation> {
        self.repo
            .find_evaluation(id)
            .await?
            .filter(Evaluation::is_active)
            .ok_or_else(|| AppError::not_found("Evaluation", id))
    }

    /// Active evaluations of a patent the caller may read
    pub async fn list_for_patent(&self, user: &AuthUser, patent_id: Uuid) -> Result<Vec<Evaluation>> {
        let patent = self.find_patent(patent_id).await?;
        self.access.ensure_view(user, patent.title_id).await?;

        let is_admin = user.is_admin();
        Ok(self
            .repo
            .active_evaluations_for_patent(patent_id)
            .await?
            .into_iter()
            .filter(|e| visible_to(e, user.id(), is_admin))
            .collect())
    }

    pub async fn create(&self, user: &AuthUser, request: CreateEvaluationRequest) -> Result<Evaluation> {
        request.validate()?;
        let patent = self.find_patent(request.patent_id).await?;
        let title = self.access.ensure_evaluate(user, patent.title_id).await?;

        let evaluation = self
            .repo
            .create_evaluation(
                &title,
                NewEvaluation {
                    patent_id: patent.id,
                    user_id: user.id(),
                    status: request.status.trim().to_string(),
                    comment: request.comment,
                    score: request.score,
                    is_public: request.is_public,
                },
            )
            .await?;

        crate::metrics::record_evaluation("create", 1);
        tracing::info!(
            evaluation_id = %evaluation.id,
            patent_id = %patent.id,
            status = %evaluation.status,
            "Evaluation created"
        );
        self.activity
            .record(Some(user), "evaluation.create", "evaluation", Some(evaluation.id), Some(evaluation.status.clone()))
            .await;

        Ok(evaluation)
    }

    /// One status for many patents of one title; nothing is written unless
    /// every patent accepts it
    pub async fn create_batch(&self, user: &AuthUser, request: BatchEvaluationRequest) -> Result<Vec<Evaluation>> {
        request.validate()?;
        let title = self.access.ensure_evaluate(user, request.title_id).await?;

        let patent_ids = distinct_ids(&request.patent_ids);
        let found: HashSet<Uuid> = self
            .repo
            .find_patents(&patent_ids)
            .await?
            .into_iter()
            .filter(|p| p.title_id == title.id)
            .map(|p| p.id)
            .collect();
        if let Some(missing) = patent_ids.iter().find(|id| !found.contains(id)) {
            return Err(AppError::not_found("Patent", missing));
        }

        let status = request.status.trim().to_string();
        let batch = patent_ids
            .iter()
            .map(|patent_id| NewEvaluation {
                patent_id: *patent_id,
                user_id: user.id(),
                status: status.clone(),
                comment: request.comment.clone(),
                score: None,
                is_public: request.is_public,
            })
            .collect();

        let created = self.repo.create_evaluations(&title, batch).await?;

        crate::metrics::record_evaluation("batch", created.len());
        tracing::info!(title_id = %title.id, count = created.len(), status = %status, "Batch evaluation created");
        self.activity
            .record(
                Some(user),
                "evaluation.batch",
                "title",
                Some(title.id),
                Some(format!("{} patents: {}", created.len(), status)),
            )
            .await;

        Ok(created)
    }

    pub async fn update(&self, user: &AuthUser, id: Uuid, request: UpdateEvaluationRequest) -> Result<Evaluation> {
        request.validate()?;
        let evaluation = self.find_active(id).await?;
        ensure_owner(&evaluation, user.id())?;
        let title = self.access.ensure_evaluate(user, evaluation.title_id).await?;

        let mut active: EvaluationActiveModel = evaluation.into();
        if let Some(status) = request.status {
            active.status = Set(status.trim().to_string());
        }
        if let Some(comment) = request.comment {
            active.comment = Set(Some(comment));
        }
        if let Some(score) = request.score {
            active.score = Set(Some(score));
        }
        if let Some(is_public) = request.is_public {
            active.is_public = Set(is_public);
        }

        let evaluation = self.repo.update_evaluation(&title, active).await?;

        crate::metrics::record_evaluation("update", 1);
        tracing::info!(evaluation_id = %evaluation.id, "Evaluation updated");
        self.activity
            .record(Some(user), "evaluation.update", "evaluation", Some(evaluation.id), None)
            .await;

        Ok(evaluation)
    }

    /// Soft delete by the author
    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> Result<()> {
        let evaluation = self.find_active(id).await?;
        ensure_owner(&evaluation, user.id())?;
        let title = self.access.ensure_view(user, evaluation.title_id).await?;

        self.repo.soft_delete_evaluation(&title, evaluation).await?;

        crate::metrics::record_evaluation("delete", 1);
        tracing::info!(evaluation_id = %id, "Evaluation deleted");
        self.activity
            .record(Some(user), "evaluation.delete", "evaluation", Some(id), None)
            .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{EvaluationState, Title, User};
    use crate::db::DbPool;
    use chrono::{TimeZone, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn evaluation(user: u128, state: EvaluationState) -> Evaluation {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().into();
        Evaluation {
            id: Uuid::from_u128(50),
            patent_id: Uuid::from_u128(20),
            title_id: Uuid::from_u128(10),
            user_id: Uuid::from_u128(user),
            status: "重要".to_string(),
            comment: None,
            score: None,
            is_public: true,
            state: state.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn author(id: u128) -> AuthUser {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().into();
        AuthUser::new(User {
            id: Uuid::from_u128(id),
            username: "u".to_string(),
            display_name: "u".to_string(),
            email: None,
            password_hash: String::new(),
            department_id: None,
            permission: "一般".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    fn service(db: MockDatabase) -> EvaluationService {
        let repo = Repository::new(DbPool::from_connection(db.into_connection()));
        EvaluationService::new(repo.clone(), AccessService::new(repo.clone()), ActivityService::new(repo))
    }

    #[tokio::test]
    async fn test_deleted_evaluation_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![evaluation(7, EvaluationState::Deleted)]]);

        let err = tokio_test::assert_err!(
            service(db)
                .update(&author(7), Uuid::from_u128(50), UpdateEvaluationRequest::default())
                .await
        );
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_other_user_cannot_delete() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![evaluation(7, EvaluationState::Active)]])
            .append_query_results([Vec::<Title>::new()]);

        let err = tokio_test::assert_err!(service(db).delete(&author(8), Uuid::from_u128(50)).await);
        assert!(matches!(err, AppError::Forbidden { .. }));
    }

    #[test]
    fn test_batch_request_defaults_public() {
        let request: BatchEvaluationRequest = serde_json::from_str(
            r#"{"title_id":"00000000-0000-0000-0000-00000000000a","patentIds":["00000000-0000-0000-0000-000000000014"],"status":"重要"}"#,
        )
        .unwrap();
        assert!(request.is_public);
        assert!(request.validate().is_ok());
    }
}
