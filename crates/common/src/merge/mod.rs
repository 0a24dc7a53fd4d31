//! Title merge planning
//!
//! [`plan_merge`] works on already-loaded source titles and decides what the
//! merged title looks like. Writing the plan happens in one transaction in
//! `Repository::insert_title_bundle`.

use crate::db::models::{next_title_no, Evaluation, Patent, Title, TitleUser};
use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Which patents are carried into the merged title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractCondition {
    /// Monitoring merge: every patent of every source
    #[serde(alias = "monitoring")]
    All,
    /// Only patents with at least one evaluation whose status is listed
    Evaluation { statuses: Vec<String> },
}

impl ExtractCondition {
    fn selects(&self, evaluations: &[Evaluation]) -> bool {
        match self {
            ExtractCondition::All => true,
            ExtractCondition::Evaluation { statuses } => evaluations
                .iter()
                .any(|e| e.is_active() && statuses.iter().any(|s| s == &e.status)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourcePatent {
    pub patent: Patent,
    /// Active evaluations only
    pub evaluations: Vec<Evaluation>,
}

#[derive(Debug, Clone)]
pub struct MergeSource {
    pub title: Title,
    pub patents: Vec<SourcePatent>,
    pub assignments: Vec<TitleUser>,
}

/// Outcome of planning, ready to be written
#[derive(Debug, Clone)]
pub struct MergePlan {
    pub title_no: String,
    pub save_date: String,
    /// First source, supplies data type, policies and evaluation flags
    pub template: Title,
    pub assignments: Vec<TitleUser>,
    pub patents: Vec<Patent>,
}

/// Union of assignments in source order; the first row per user wins.
///
/// Only the first surviving main-responsible flag is kept so the merged
/// title still has at most one.
pub fn union_assignments<'a>(sources: impl IntoIterator<Item = &'a [TitleUser]>) -> Vec<TitleUser> {
    let mut seen = HashSet::new();
    let mut has_main = false;
    let mut merged = Vec::new();

    for assignments in sources {
        let mut ordered: Vec<&TitleUser> = assignments.iter().collect();
        ordered.sort_by_key(|a| a.display_order);

        for assignment in ordered {
            if !seen.insert(assignment.user_id) {
                continue;
            }
            let mut row = assignment.clone();
            if row.is_main_responsible {
                if has_main {
                    row.is_main_responsible = false;
                } else {
                    has_main = true;
                }
            }
            row.display_order = merged.len() as i32;
            merged.push(row);
        }
    }

    merged
}

/// Keep the first patent per [`Patent::dedup_key`]
pub fn dedup_patents(patents: impl IntoIterator<Item = Patent>) -> Vec<Patent> {
    let mut seen = HashSet::new();
    patents
        .into_iter()
        .filter(|p| seen.insert(p.dedup_key()))
        .collect()
}

/// Plan a merge of `sources` (in caller order) into a new title
pub fn plan_merge(
    sources: &[MergeSource],
    condition: &ExtractCondition,
    latest_title_no: Option<&str>,
) -> Result<MergePlan> {
    let first = sources
        .first()
        .ok_or_else(|| AppError::validation("at least one source title is required"))?;

    if let ExtractCondition::Evaluation { statuses } = condition {
        if statuses.is_empty() {
            return Err(AppError::Validation {
                message: "evaluation condition needs at least one status".to_string(),
                field: Some("condition".to_string()),
            });
        }
    }

    let save_date = sources
        .iter()
        .map(|s| s.title.save_date.as_str())
        .max()
        .unwrap_or_default()
        .to_string();

    let assignments = union_assignments(sources.iter().map(|s| s.assignments.as_slice()));

    let selected = sources
        .iter()
        .flat_map(|s| s.patents.iter())
        .filter(|sp| condition.selects(&sp.evaluations))
        .map(|sp| sp.patent.clone());

    let patents = dedup_patents(selected);

    Ok(MergePlan {
        title_no: next_title_no(latest_title_no),
        save_date,
        template: first.title.clone(),
        assignments,
        patents,
    })
}

/// Source ids in request order with repeats removed
pub fn distinct_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{EvaluationState, STATUS_UNEVALUATED};
    use chrono::{TimeZone, Utc};

    fn now() -> sea_orm::prelude::DateTimeWithTimeZone {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap().into()
    }

    fn title(id: u128, save_date: &str) -> Title {
        Title {
            id: Uuid::from_u128(id),
            title_no: format!("{:06}", id),
            name: format!("title {}", id),
            data_type: "patent".to_string(),
            department_id: None,
            created_by: Uuid::from_u128(1000),
            view_permission: Some("assigned".to_string()),
            edit_permission: Some("assigned".to_string()),
            evaluation_enabled: true,
            main_evaluation: false,
            single_patent_multiple_evaluations: false,
            parent_id: None,
            save_date: save_date.to_string(),
            description: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn patent(id: u128, title_id: u128, patent_no: Option<&str>, status: &str) -> Patent {
        Patent {
            id: Uuid::from_u128(id),
            title_id: Uuid::from_u128(title_id),
            patent_no: patent_no.map(String::from),
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
            evaluation_status: status.to_string(),
            memo: None,
            created_by: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn evaluation(patent: &Patent, status: &str) -> Evaluation {
        Evaluation {
            id: Uuid::new_v4(),
            patent_id: patent.id,
            title_id: patent.title_id,
            user_id: Uuid::from_u128(1),
            status: status.to_string(),
            comment: None,
            score: None,
            is_public: true,
            state: EvaluationState::Active.into(),
            created_at: now(),
            updated_at: now(),
        }
    }

    fn assignment(title_id: u128, user: u128, main: bool, order: i32) -> TitleUser {
        TitleUser {
            id: Uuid::new_v4(),
            title_id: Uuid::from_u128(title_id),
            user_id: Uuid::from_u128(user),
            permission: "一般".to_string(),
            is_main_responsible: main,
            notify_on_evaluation: false,
            notify_on_update: false,
            display_order: order,
        }
    }

    fn source(t: Title, patents: Vec<SourcePatent>, assignments: Vec<TitleUser>) -> MergeSource {
        MergeSource {
            title: t,
            patents,
            assignments,
        }
    }

    fn plain(p: Patent) -> SourcePatent {
        SourcePatent {
            patent: p,
            evaluations: vec![],
        }
    }

    #[test]
    fn test_duplicate_patent_numbers_collapse() {
        let a = source(
            title(1, "2024/01"),
            vec![plain(patent(11, 1, Some("P-100"), "評価済"))],
            vec![],
        );
        let b = source(
            title(2, "2024/02"),
            vec![
                plain(patent(21, 2, Some("P-100"), "要検討")),
                plain(patent(22, 2, Some("P-200"), "評価済")),
            ],
            vec![],
        );

        let plan = plan_merge(&[a, b], &ExtractCondition::All, Some("000041")).unwrap();

        let p100: Vec<_> = plan
            .patents
            .iter()
            .filter(|p| p.patent_no.as_deref() == Some("P-100"))
            .collect();
        assert_eq!(p100.len(), 1);
        assert_eq!(p100[0].id, Uuid::from_u128(11));
        assert_eq!(plan.patents.len(), 2);
        assert_eq!(plan.title_no, "000042");
    }

    #[test]
    fn test_missing_patent_no_falls_back_to_id() {
        let a = source(
            title(1, "2024/01"),
            vec![
                plain(patent(11, 1, None, STATUS_UNEVALUATED)),
                plain(patent(12, 1, Some("  "), STATUS_UNEVALUATED)),
            ],
            vec![],
        );
        let plan = plan_merge(&[a], &ExtractCondition::All, None).unwrap();
        assert_eq!(plan.patents.len(), 2);
        assert_eq!(plan.title_no, "000001");
    }

    #[test]
    fn test_assignment_union() {
        let a = source(title(1, "2024/01"), vec![], vec![assignment(1, 1, true, 0)]);
        let b = source(
            title(2, "2024/01"),
            vec![],
            vec![assignment(2, 1, false, 0), assignment(2, 2, true, 1)],
        );

        let plan = plan_merge(&[a, b], &ExtractCondition::All, None).unwrap();
        let users: Vec<_> = plan.assignments.iter().map(|a| a.user_id).collect();
        assert_eq!(users, vec![Uuid::from_u128(1), Uuid::from_u128(2)]);

        // u1 came from title A with its main flag; u2's flag is dropped
        assert!(plan.assignments[0].is_main_responsible);
        assert!(!plan.assignments[1].is_main_responsible);
        assert_eq!(plan.assignments[1].display_order, 1);
    }

    #[test]
    fn test_evaluation_condition_filters_on_any_evaluation() {
        let keep = patent(11, 1, Some("P-1"), "評価済");
        let drop = patent(12, 1, Some("P-2"), "評価済");
        let mut deleted = evaluation(&drop, "重要");
        deleted.state = EvaluationState::Deleted.into();

        let a = source(
            title(1, "2024/01"),
            vec![
                SourcePatent {
                    evaluations: vec![evaluation(&keep, "不要"), evaluation(&keep, "重要")],
                    patent: keep,
                },
                SourcePatent {
                    evaluations: vec![evaluation(&drop, "不要"), deleted],
                    patent: drop,
                },
            ],
            vec![],
        );

        let condition = ExtractCondition::Evaluation {
            statuses: vec!["重要".to_string()],
        };
        let plan = plan_merge(&[a], &condition, None).unwrap();
        assert_eq!(plan.patents.len(), 1);
        assert_eq!(plan.patents[0].patent_no.as_deref(), Some("P-1"));
    }

    #[test]
    fn test_save_date_takes_latest() {
        let a = source(title(1, "2023/12"), vec![], vec![]);
        let b = source(title(2, "2024/03"), vec![], vec![]);
        let c = source(title(3, "2024/01"), vec![], vec![]);
        let plan = plan_merge(&[a, b, c], &ExtractCondition::All, None).unwrap();
        assert_eq!(plan.save_date, "2024/03");
        assert_eq!(plan.template.id, Uuid::from_u128(1));
    }

    #[test]
    fn test_empty_sources_rejected() {
        let err = plan_merge(&[], &ExtractCondition::All, None).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_empty_allow_list_rejected() {
        let a = source(title(1, "2024/01"), vec![], vec![]);
        let condition = ExtractCondition::Evaluation { statuses: vec![] };
        assert!(plan_merge(&[a], &condition, None).is_err());
    }

    #[test]
    fn test_distinct_ids_keeps_order() {
        let (a, b) = (Uuid::from_u128(1), Uuid::from_u128(2));
        assert_eq!(distinct_ids(&[b, a, b]), vec![b, a]);
    }
}
