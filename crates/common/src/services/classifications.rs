//! Classification bucket counts and regeneration

use super::access::AccessService;
use super::activity::ActivityService;
use crate::auth::AuthUser;
use crate::classification::ClassificationType;
use crate::db::{ClassificationCount, Repository};
use crate::errors::Result;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationSummary {
    pub title_id: Uuid,
    #[serde(rename = "type")]
    pub kind: ClassificationType,
    pub buckets: Vec<ClassificationCount>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReclassifyResult {
    pub title_id: Uuid,
    pub classified: usize,
}

#[derive(Clone)]
pub struct ClassificationService {
    repo: Repository,
    access: AccessService,
    activity: ActivityService,
}

impl ClassificationService {
    pub fn new(repo: Repository, access: AccessService, activity: ActivityService) -> Self {
        Self { repo, access, activity }
    }

    /// Counts per bucket; `kind` defaults to month
    pub async fn summary(
        &self,
        user: &AuthUser,
        title_id: Uuid,
        kind: Option<ClassificationType>,
    ) -> Result<ClassificationSummary> {
        self.access.ensure_view(user, title_id).await?;
        let kind = kind.unwrap_or(ClassificationType::Month);
        let buckets = self.repo.classification_counts(title_id, kind).await?;
        Ok(ClassificationSummary { title_id, kind, buckets })
    }

    /// Rebuild the rows of every patent in the title
    pub async fn auto_classify(&self, user: &AuthUser, title_id: Uuid) -> Result<ReclassifyResult> {
        self.access.ensure_edit(user, title_id).await?;

        let classified = self.repo.reclassify_title(title_id).await?;

        tracing::info!(title_id = %title_id, classified, "Title reclassified");
        self.activity
            .record(
                Some(user),
                "classification.regenerate",
                "title",
                Some(title_id),
                Some(format!("{} patents", classified)),
            )
            .await;

        Ok(ReclassifyResult { title_id, classified })
    }
}
