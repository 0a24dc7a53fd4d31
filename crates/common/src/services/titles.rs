//! Title lifecycle: create, update, delete, copy and merge

use super::access::AccessService;
use super::activity::ActivityService;
use crate::auth::AuthUser;
use crate::db::models::{
    next_title_no, AccessPolicy, Permission, Title, TitleActiveModel, TitleUser,
};
use crate::db::{clamp_page, NewAssignment, NewPatent, NewTitle, Page, Repository, TitleBundle};
use crate::errors::{AppError, Result};
use crate::merge::{distinct_ids, plan_merge, ExtractCondition, MergeSource, SourcePatent};
use crate::permission::{can_view, TitleAccess};
use crate::uploads::UploadStore;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_DATA_TYPE: &str = "patent";

fn default_true() -> bool {
    true
}

/// One assignee in a create/update body; list position is the display order
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentInput {
    pub user_id: Uuid,
    #[serde(default)]
    pub permission: Option<Permission>,
    #[serde(default)]
    pub is_main_responsible: bool,
    #[serde(default)]
    pub notify_on_evaluation: bool,
    #[serde(default)]
    pub notify_on_update: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTitleRequest {
    #[validate(length(min = 1, max = 500))]
    pub name: String,

    #[validate(length(min = 1, max = 50))]
    pub data_type: Option<String>,

    pub department_id: Option<Uuid>,

    pub view_permission: Option<AccessPolicy>,

    pub edit_permission: Option<AccessPolicy>,

    #[serde(default = "default_true")]
    pub evaluation_enabled: bool,

    #[serde(default)]
    pub main_evaluation: bool,

    #[serde(default)]
    pub single_patent_multiple_evaluations: bool,

    pub parent_id: Option<Uuid>,

    /// `YYYY/MM`; defaults to the current month
    pub save_date: Option<String>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[serde(default)]
    pub users: Vec<AssignmentInput>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTitleRequest {
    #[validate(length(min = 1, max = 500))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 50))]
    pub data_type: Option<String>,

    pub department_id: Option<Uuid>,

    pub view_permission: Option<AccessPolicy>,

    pub edit_permission: Option<AccessPolicy>,

    pub evaluation_enabled: Option<bool>,

    pub main_evaluation: Option<bool>,

    pub single_patent_multiple_evaluations: Option<bool>,

    pub save_date: Option<String>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    /// Replaces the whole assignment list when present
    pub users: Option<Vec<AssignmentInput>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CopyTitleRequest {
    #[validate(length(min = 1, max = 500))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MergeTitlesRequest {
    #[validate(length(min = 1, max = 500))]
    pub name: String,

    pub department_id: Option<Uuid>,

    #[validate(length(min = 1))]
    pub source_title_ids: Vec<Uuid>,

    pub condition: ExtractCondition,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleDetail {
    #[serde(flatten)]
    pub title: Title,
    pub assignments: Vec<TitleUser>,
    pub patent_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    pub title_id: Uuid,
    pub title_no: String,
    pub merged_count: usize,
    pub message: String,
}

/// `YYYY/MM` with a real month
pub fn is_valid_save_date(value: &str) -> bool {
    let Some((year, month)) = value.split_once('/') else {
        return false;
    };
    year.len() == 4
        && month.len() == 2
        && year.bytes().all(|b| b.is_ascii_digit())
        && month.parse::<u32>().is_ok_and(|m| (1..=12).contains(&m))
}

fn current_save_date() -> String {
    chrono::Local::now().format("%Y/%m").to_string()
}

fn check_save_date(value: &str) -> Result<()> {
    if is_valid_save_date(value) {
        Ok(())
    } else {
        Err(AppError::Validation {
            message: format!("saveDate must be YYYY/MM, got '{}'", value),
            field: Some("saveDate".to_string()),
        })
    }
}

/// Turn the request list into rows: unique users, at most one main
/// responsible, display order following the list.
pub fn build_assignments(inputs: &[AssignmentInput]) -> Result<Vec<NewAssignment>> {
    let mut seen = HashSet::new();
    if let Some(dup) = inputs.iter().find(|a| !seen.insert(a.user_id)) {
        return Err(AppError::Validation {
            message: format!("user {} is assigned more than once", dup.user_id),
            field: Some("users".to_string()),
        });
    }

    if inputs.iter().filter(|a| a.is_main_responsible).count() > 1 {
        return Err(AppError::Validation {
            message: "only one user can be main responsible".to_string(),
            field: Some("users".to_string()),
        });
    }

    Ok(inputs
        .iter()
        .enumerate()
        .map(|(order, a)| NewAssignment {
            user_id: a.user_id,
            permission: a.permission.unwrap_or(Permission::General).as_str().to_string(),
            is_main_responsible: a.is_main_responsible,
            notify_on_evaluation: a.notify_on_evaluation,
            notify_on_update: a.notify_on_update,
            display_order: order as i32,
        })
        .collect())
}

#[derive(Clone)]
pub struct TitleService {
    repo: Repository,
    access: AccessService,
    activity: ActivityService,
    uploads: UploadStore,
}

impl TitleService {
    pub fn new(repo: Repository, access: AccessService, activity: ActivityService, uploads: UploadStore) -> Self {
        Self {
            repo,
            access,
            activity,
            uploads,
        }
    }

    pub async fn list(
        &self,
        user: &AuthUser,
        search: Option<&str>,
        page: Option<u64>,
        per_page: Option<u64>,
    ) -> Result<Page<Title>> {
        let (page, per_page) = clamp_page(page, per_page);
        let titles = self.access.viewable_titles(user, search).await?;
        Ok(Page::from_vec(titles, page, per_page))
    }

    pub async fn get(&self, user: &AuthUser, id: Uuid) -> Result<TitleDetail> {
        let title = self.access.ensure_view(user, id).await?;
        let assignments = self.repo.title_assignments(id).await?;
        let patent_count = self.repo.count_patents(id).await?;
        Ok(TitleDetail {
            title,
            assignments,
            patent_count,
        })
    }

    async fn ensure_users_exist(&self, assignments: &[NewAssignment]) -> Result<()> {
        let ids: Vec<Uuid> = assignments.iter().map(|a| a.user_id).collect();
        let found: HashSet<Uuid> = self.repo.find_users(&ids).await?.into_iter().map(|u| u.id).collect();
        match ids.into_iter().find(|id| !found.contains(id)) {
            Some(missing) => Err(AppError::not_found("User", missing)),
            None => Ok(()),
        }
    }

    async fn ensure_department(&self, id: Option<Uuid>) -> Result<()> {
        if let Some(id) = id {
            if self.repo.find_department(id).await?.is_none() {
                return Err(AppError::not_found("Department", id));
            }
        }
        Ok(())
    }

    pub async fn create(&self, user: &AuthUser, request: CreateTitleRequest) -> Result<TitleDetail> {
        user.require_at_least(Permission::General)?;
        request.validate()?;

        let save_date = request.save_date.unwrap_or_else(current_save_date);
        check_save_date(&save_date)?;

        let assignments = build_assignments(&request.users)?;
        self.ensure_users_exist(&assignments).await?;
        self.ensure_department(request.department_id).await?;
        if let Some(parent_id) = request.parent_id {
            self.access.ensure_view(user, parent_id).await?;
        }

        let latest = self.repo.latest_title_no().await?;
        let bundle = TitleBundle {
            title: NewTitle {
                title_no: next_title_no(latest.as_deref()),
                name: request.name.trim().to_string(),
                data_type: request.data_type.unwrap_or_else(|| DEFAULT_DATA_TYPE.to_string()),
                department_id: request.department_id.or(user.user.department_id),
                created_by: user.id(),
                view_permission: Some(request.view_permission.unwrap_or(AccessPolicy::All).as_str().to_string()),
                edit_permission: Some(request.edit_permission.unwrap_or(AccessPolicy::Creator).as_str().to_string()),
                evaluation_enabled: request.evaluation_enabled,
                main_evaluation: request.main_evaluation,
                single_patent_multiple_evaluations: request.single_patent_multiple_evaluations,
                parent_id: request.parent_id,
                save_date,
                description: request.description,
            },
            assignments,
            patents: Vec::new(),
        };

        let (title, _) = self.repo.insert_title_bundle(bundle).await?;

        tracing::info!(title_id = %title.id, title_no = %title.title_no, user_id = %user.id(), "Title created");
        self.activity
            .record(Some(user), "title.create", "title", Some(title.id), Some(title.title_no.clone()))
            .await;

        self.get(user, title.id).await
    }

    pub async fn update(&self, user: &AuthUser, id: Uuid, request: UpdateTitleRequest) -> Result<TitleDetail> {
        request.validate()?;
        let title = self.access.ensure_edit(user, id).await?;

        let assignments = match &request.users {
            Some(inputs) => {
                let rows = build_assignments(inputs)?;
                self.ensure_users_exist(&rows).await?;
                Some(rows)
            }
            None => None,
        };
        self.ensure_department(request.department_id).await?;

        let mut active: TitleActiveModel = title.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(data_type) = request.data_type {
            active.data_type = Set(data_type);
        }
        if let Some(department_id) = request.department_id {
            active.department_id = Set(Some(department_id));
        }
        if let Some(policy) = request.view_permission {
            active.view_permission = Set(Some(policy.as_str().to_string()));
        }
        if let Some(policy) = request.edit_permission {
            active.edit_permission = Set(Some(policy.as_str().to_string()));
        }
        if let Some(flag) = request.evaluation_enabled {
            active.evaluation_enabled = Set(flag);
        }
        if let Some(flag) = request.main_evaluation {
            active.main_evaluation = Set(flag);
        }
        if let Some(flag) = request.single_patent_multiple_evaluations {
            active.single_patent_multiple_evaluations = Set(flag);
        }
        if let Some(save_date) = request.save_date {
            check_save_date(&save_date)?;
            active.save_date = Set(save_date);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }

        let title = self.repo.update_title(active, assignments).await?;

        tracing::info!(title_id = %title.id, user_id = %user.id(), "Title updated");
        self.activity
            .record(Some(user), "title.update", "title", Some(title.id), None)
            .await;

        self.get(user, title.id).await
    }

    /// Remove the title, everything below it, and its attachment files
    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> Result<()> {
        let title = self.access.ensure_edit(user, id).await?;

        let attachments = self
            .repo
            .delete_title(id)
            .await?
            .ok_or_else(|| AppError::not_found("Title", id))?;

        for attachment in &attachments {
            if let Err(e) = self.uploads.remove(&attachment.stored_name).await {
                tracing::warn!(attachment_id = %attachment.id, error = %e, "Failed to remove attachment file");
            }
        }

        tracing::info!(title_id = %id, title_no = %title.title_no, files = attachments.len(), "Title deleted");
        self.activity
            .record(Some(user), "title.delete", "title", Some(id), Some(title.title_no))
            .await;

        Ok(())
    }

    /// New title with the same settings, assignments and patents; patent
    /// statuses start over
    pub async fn copy(&self, user: &AuthUser, id: Uuid, request: CopyTitleRequest) -> Result<TitleDetail> {
        user.require_at_least(Permission::General)?;
        request.validate()?;
        let source = self.access.ensure_view(user, id).await?;

        let assignments = self.repo.title_assignments(id).await?;
        let patents = self.repo.patents_of_titles(&[id]).await?;
        let latest = self.repo.latest_title_no().await?;

        let bundle = TitleBundle {
            title: NewTitle {
                title_no: next_title_no(latest.as_deref()),
                name: request
                    .name
                    .map(|n| n.trim().to_string())
                    .unwrap_or_else(|| format!("{} (コピー)", source.name)),
                data_type: source.data_type.clone(),
                department_id: source.department_id,
                created_by: user.id(),
                view_permission: source.view_permission.clone(),
                edit_permission: source.edit_permission.clone(),
                evaluation_enabled: source.evaluation_enabled,
                main_evaluation: source.main_evaluation,
                single_patent_multiple_evaluations: source.single_patent_multiple_evaluations,
                parent_id: Some(source.id),
                save_date: source.save_date.clone(),
                description: source.description.clone(),
            },
            assignments: assignments.iter().map(NewAssignment::from).collect(),
            patents: patents.iter().map(|p| NewPatent::copy_of(p, user.id())).collect(),
        };

        let (title, copied) = self.repo.insert_title_bundle(bundle).await?;

        tracing::info!(
            source_id = %id,
            title_id = %title.id,
            title_no = %title.title_no,
            patents = copied,
            "Title copied"
        );
        self.activity
            .record(
                Some(user),
                "title.copy",
                "title",
                Some(title.id),
                Some(format!("from {} ({} patents)", source.title_no, copied)),
            )
            .await;

        self.get(user, title.id).await
    }

    /// Merge several titles into a new one. Every source must exist and be
    /// viewable before anything is written.
    pub async fn merge(&self, user: &AuthUser, request: MergeTitlesRequest) -> Result<MergeResult> {
        user.require_at_least(Permission::General)?;
        request.validate()?;
        self.ensure_department(request.department_id).await?;

        let ids = distinct_ids(&request.source_title_ids);

        let mut titles: HashMap<Uuid, Title> = self
            .repo
            .find_titles(&ids)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();
        if let Some(missing) = ids.iter().find(|id| !titles.contains_key(id)) {
            return Err(AppError::not_found("Title", missing));
        }

        let mut assignments: HashMap<Uuid, Vec<TitleUser>> = HashMap::new();
        for row in self.repo.assignments_for_titles(&ids).await? {
            assignments.entry(row.title_id).or_default().push(row);
        }

        for id in &ids {
            let title = &titles[id];
            let rows = assignments.get(id).map(Vec::as_slice).unwrap_or(&[]);
            if !can_view(&user.actor, &TitleAccess::from_title(title, rows)) {
                return Err(AppError::forbidden(format!("no view permission on title {}", title.title_no)));
            }
        }

        let patents = self.repo.patents_of_titles(&ids).await?;
        let evaluations = match &request.condition {
            ExtractCondition::All => Vec::new(),
            ExtractCondition::Evaluation { .. } => {
                let patent_ids: Vec<Uuid> = patents.iter().map(|p| p.id).collect();
                self.repo.active_evaluations_for_patents(&patent_ids).await?
            }
        };

        let mut evaluations_by_patent: HashMap<Uuid, Vec<_>> = HashMap::new();
        for evaluation in evaluations {
            evaluations_by_patent.entry(evaluation.patent_id).or_default().push(evaluation);
        }
        let mut patents_by_title: HashMap<Uuid, Vec<SourcePatent>> = HashMap::new();
        for patent in patents {
            let evaluations = evaluations_by_patent.remove(&patent.id).unwrap_or_default();
            patents_by_title
                .entry(patent.title_id)
                .or_default()
                .push(SourcePatent { patent, evaluations });
        }

        let sources: Vec<MergeSource> = ids
            .iter()
            .filter_map(|id| {
                titles.remove(id).map(|title| MergeSource {
                    title,
                    patents: patents_by_title.remove(id).unwrap_or_default(),
                    assignments: assignments.remove(id).unwrap_or_default(),
                })
            })
            .collect();

        let latest = self.repo.latest_title_no().await?;
        let plan = plan_merge(&sources, &request.condition, latest.as_deref())?;

        let template = &plan.template;
        let bundle = TitleBundle {
            title: NewTitle {
                title_no: plan.title_no.clone(),
                name: request.name.trim().to_string(),
                data_type: template.data_type.clone(),
                department_id: request.department_id.or(template.department_id),
                created_by: user.id(),
                view_permission: template.view_permission.clone(),
                edit_permission: template.edit_permission.clone(),
                evaluation_enabled: template.evaluation_enabled,
                main_evaluation: template.main_evaluation,
                single_patent_multiple_evaluations: template.single_patent_multiple_evaluations,
                parent_id: None,
                save_date: plan.save_date.clone(),
                description: None,
            },
            assignments: plan.assignments.iter().map(NewAssignment::from).collect(),
            patents: plan.patents.iter().map(|p| NewPatent::copy_of(p, user.id())).collect(),
        };

        let (title, merged_count) = self.repo.insert_title_bundle(bundle).await?;

        crate::metrics::record_merge(merged_count);
        tracing::info!(
            title_id = %title.id,
            title_no = %title.title_no,
            sources = ids.len(),
            patents = merged_count,
            "Titles merged"
        );

        let source_nos: Vec<&str> = sources.iter().map(|s| s.title.title_no.as_str()).collect();
        self.activity
            .record(
                Some(user),
                "title.merge",
                "title",
                Some(title.id),
                Some(format!("sources: {}", source_nos.join(", "))),
            )
            .await;

        Ok(MergeResult {
            title_id: title.id,
            title_no: title.title_no,
            merged_count,
            message: format!("{} titles merged into {} with {} patents", ids.len(), plan.title_no, merged_count),
        })
    }
}
