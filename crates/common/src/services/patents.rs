//! Patent records under a title

use super::access::AccessService;
use super::activity::ActivityService;
use crate::auth::AuthUser;
use crate::db::models::{Patent, PatentActiveModel, PatentClassification, Title};
use crate::db::{apply_fields, clamp_page, NewPatent, Page, Repository};
use crate::errors::{AppError, Result};
use crate::fields::PatentFields;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatentRequest {
    #[serde(alias = "title_id")]
    pub title_id: Uuid,

    #[serde(flatten)]
    pub fields: PatentFields,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusRequest {
    #[validate(length(min = 1, max = 50))]
    #[serde(alias = "evaluation_status")]
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatentDetail {
    #[serde(flatten)]
    pub patent: Patent,
    pub classifications: Vec<PatentClassification>,
}

fn ensure_identifier(fields: &PatentFields) -> Result<()> {
    if fields.has_identifier() {
        Ok(())
    } else {
        Err(AppError::validation(
            "one of patentNo, applicationNo, publicationNo or registrationNo is required",
        ))
    }
}

#[derive(Clone)]
pub struct PatentService {
    repo: Repository,
    access: AccessService,
    activity: ActivityService,
}

impl PatentService {
    pub fn new(repo: Repository, access: AccessService, activity: ActivityService) -> Self {
        Self { repo, access, activity }
    }

    /// The patent and its title, when `user` can view the title
    async fn load_viewable(&self, user: &AuthUser, id: Uuid) -> Result<(Patent, Title)> {
        let patent = self
            .repo
            .find_patent(id)
            .await?
            .ok_or_else(|| AppError::not_found("Patent", id))?;
        let title = self.access.ensure_view(user, patent.title_id).await?;
        Ok((patent, title))
    }

    async fn load_editable(&self, user: &AuthUser, id: Uuid) -> Result<(Patent, Title)> {
        let patent = self
            .repo
            .find_patent(id)
            .await?
            .ok_or_else(|| AppError::not_found("Patent", id))?;
        let title = self.access.ensure_edit(user, patent.title_id).await?;
        Ok((patent, title))
    }

    pub async fn list(
        &self,
        user: &AuthUser,
        title_id: Uuid,
        status: Option<&str>,
        page: Option<u64>,
        per_page: Option<u64>,
    ) -> Result<Page<Patent>> {
        self.access.ensure_view(user, title_id).await?;
        let (page, per_page) = clamp_page(page, per_page);
        self.repo.list_patents(title_id, status, page, per_page).await
    }

    pub async fn get(&self, user: &AuthUser, id: Uuid) -> Result<PatentDetail> {
        let (patent, _) = self.load_viewable(user, id).await?;
        let classifications = self.repo.classifications_for_patent(id).await?;
        Ok(PatentDetail { patent, classifications })
    }

    pub async fn create(&self, user: &AuthUser, request: CreatePatentRequest) -> Result<Patent> {
        request.fields.validate()?;
        ensure_identifier(&request.fields)?;
        let title = self.access.ensure_edit(user, request.title_id).await?;

        let patent = self
            .repo
            .create_patent(title.id, NewPatent::new(request.fields, Some(user.id())))
            .await?;

        tracing::info!(patent_id = %patent.id, title_id = %title.id, user_id = %user.id(), "Patent created");
        self.activity
            .record(Some(user), "patent.create", "patent", Some(patent.id), Some(title.title_no))
            .await;

        Ok(patent)
    }

    pub async fn update(&self, user: &AuthUser, id: Uuid, fields: PatentFields) -> Result<Patent> {
        fields.validate()?;
        let (previous, _) = self.load_editable(user, id).await?;

        let mut active: PatentActiveModel = previous.clone().into();
        apply_fields(&mut active, fields);
        let patent = self.repo.update_patent(&previous, active).await?;

        tracing::info!(patent_id = %patent.id, user_id = %user.id(), "Patent updated");
        self.activity
            .record(Some(user), "patent.update", "patent", Some(patent.id), None)
            .await;

        Ok(patent)
    }

    /// Set the evaluation status directly, bypassing evaluations
    pub async fn set_status(&self, user: &AuthUser, id: Uuid, request: SetStatusRequest) -> Result<Patent> {
        request.validate()?;
        let (patent, _) = self.load_editable(user, id).await?;

        let previous = patent.evaluation_status.clone();
        let patent = self.repo.set_patent_status(patent, request.status.trim().to_string()).await?;

        tracing::info!(patent_id = %patent.id, from = %previous, to = %patent.evaluation_status, "Patent status set");
        self.activity
            .record(
                Some(user),
                "patent.status",
                "patent",
                Some(patent.id),
                Some(format!("{} -> {}", previous, patent.evaluation_status)),
            )
            .await;

        Ok(patent)
    }

    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> Result<()> {
        self.load_editable(user, id).await?;

        if !self.repo.delete_patent(id).await? {
            return Err(AppError::not_found("Patent", id));
        }

        tracing::info!(patent_id = %id, user_id = %user.id(), "Patent deleted");
        self.activity
            .record(Some(user), "patent.delete", "patent", Some(id), None)
            .await;

        Ok(())
    }

    /// Patents whose applicant contains `name`, across every title the
    /// caller can view
    pub async fn search_by_company(&self, user: &AuthUser, name: &str) -> Result<Vec<Patent>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation {
                message: "company name must not be empty".to_string(),
                field: Some("name".to_string()),
            });
        }

        let title_ids: Vec<Uuid> = self
            .access
            .viewable_titles(user, None)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();

        self.repo.search_patents_by_applicant(name, &title_ids).await
    }
}
