//! Evaluation workflow rules
//!
//! Multiplicity, ownership and patent-status mirroring, kept free of I/O so
//! the service layer only has to load rows and apply the verdicts.

use crate::db::models::{Evaluation, Title, STATUS_UNEVALUATED};
use crate::errors::{AppError, Result};
use uuid::Uuid;

/// Reject a second active evaluation by the same user on the same patent
/// unless the title allows several.
pub fn ensure_can_submit(title: &Title, existing: &[Evaluation], user_id: Uuid, patent_id: Uuid) -> Result<()> {
    if title.single_patent_multiple_evaluations {
        return Ok(());
    }

    let duplicate = existing
        .iter()
        .any(|e| e.is_active() && e.user_id == user_id && e.patent_id == patent_id);

    if duplicate {
        return Err(AppError::conflict(format!(
            "an active evaluation by this user already exists for patent {}",
            patent_id
        )));
    }

    Ok(())
}

/// Only the author may change or delete an evaluation; deleted rows are gone
/// as far as callers are concerned.
pub fn ensure_owner(evaluation: &Evaluation, user_id: Uuid) -> Result<()> {
    if !evaluation.is_active() {
        return Err(AppError::not_found("Evaluation", evaluation.id));
    }
    if evaluation.user_id != user_id {
        return Err(AppError::forbidden("only the author can modify this evaluation"));
    }
    Ok(())
}

/// Patent status after the evaluation set changed.
///
/// `None` means the title does not mirror evaluations and the patent keeps
/// whatever status it has.
pub fn mirrored_status(title: &Title, active: &[Evaluation]) -> Option<String> {
    if !title.main_evaluation {
        return None;
    }
    let latest = active
        .iter()
        .filter(|e| e.is_active())
        .max_by_key(|e| (e.updated_at, e.created_at));
    Some(
        latest
            .map(|e| e.status.clone())
            .unwrap_or_else(|| STATUS_UNEVALUATED.to_string()),
    )
}

/// Whether `viewer` may read `evaluation` in a listing
pub fn visible_to(evaluation: &Evaluation, viewer: Uuid, viewer_is_admin: bool) -> bool {
    evaluation.is_active() && (evaluation.is_public || viewer_is_admin || evaluation.user_id == viewer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::EvaluationState;
    use chrono::{Duration, TimeZone, Utc};

    fn title(multiple: bool, main: bool) -> Title {
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
            main_evaluation: main,
            single_patent_multiple_evaluations: multiple,
            parent_id: None,
            save_date: "2024/01".to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn evaluation(user: u128, patent: u128, status: &str, minutes: i64) -> Evaluation {
        let at = (Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)).into();
        Evaluation {
            id: Uuid::new_v4(),
            patent_id: Uuid::from_u128(patent),
            title_id: Uuid::from_u128(1),
            user_id: Uuid::from_u128(user),
            status: status.to_string(),
            comment: None,
            score: None,
            is_public: true,
            state: EvaluationState::Active.into(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_second_evaluation_conflicts_until_soft_deleted() {
        let t = title(false, false);
        let (user, patent) = (Uuid::from_u128(7), Uuid::from_u128(50));

        let mut existing = vec![evaluation(7, 50, "評価済", 0)];
        let err = ensure_can_submit(&t, &existing, user, patent).unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));

        existing[0].state = EvaluationState::Deleted.into();
        assert!(ensure_can_submit(&t, &existing, user, patent).is_ok());
    }

    #[test]
    fn test_multiple_allowed_when_title_permits() {
        let t = title(true, false);
        let existing = vec![evaluation(7, 50, "評価済", 0)];
        assert!(ensure_can_submit(&t, &existing, Uuid::from_u128(7), Uuid::from_u128(50)).is_ok());
    }

    #[test]
    fn test_other_users_do_not_conflict() {
        let t = title(false, false);
        let existing = vec![evaluation(8, 50, "評価済", 0)];
        assert!(ensure_can_submit(&t, &existing, Uuid::from_u128(7), Uuid::from_u128(50)).is_ok());
    }

    #[test]
    fn test_owner_check() {
        let mut e = evaluation(7, 50, "評価済", 0);
        assert!(ensure_owner(&e, Uuid::from_u128(7)).is_ok());
        assert!(matches!(
            ensure_owner(&e, Uuid::from_u128(8)),
            Err(AppError::Forbidden { .. })
        ));
        e.state = EvaluationState::Deleted.into();
        assert!(matches!(
            ensure_owner(&e, Uuid::from_u128(7)),
            Err(AppError::NotFound { .. })
        ));
    }

    #[test]
    fn test_mirrored_status_follows_latest() {
        let t = title(true, true);
        let evals = vec![evaluation(7, 50, "要検討", 0), evaluation(8, 50, "重要", 5)];
        assert_eq!(mirrored_status(&t, &evals).as_deref(), Some("重要"));
        assert_eq!(mirrored_status(&t, &[]).as_deref(), Some(STATUS_UNEVALUATED));
        assert_eq!(mirrored_status(&title(true, false), &evals), None);
    }

    #[test]
    fn test_private_evaluations_hidden_from_others() {
        let mut e = evaluation(7, 50, "評価済", 0);
        e.is_public = false;
        assert!(visible_to(&e, Uuid::from_u128(7), false));
        assert!(!visible_to(&e, Uuid::from_u128(8), false));
        assert!(visible_to(&e, Uuid::from_u128(8), true));
    }
}
