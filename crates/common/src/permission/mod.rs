//! Title access decisions
//!
//! Pure functions over a [`TitleAccess`] snapshot. Loading the snapshot and
//! turning a denial into an error is the caller's job
//! (see `services::access`).

use crate::db::models::{AccessPolicy, Permission, Title, TitleUser};
use std::collections::HashSet;
use uuid::Uuid;

/// The acting user as seen by the evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub permission: Permission,
}

impl Actor {
    pub fn new(user_id: Uuid, permission: Permission) -> Self {
        Self { user_id, permission }
    }

    pub fn is_admin(&self) -> bool {
        self.permission.is_admin()
    }
}

/// Everything the evaluator needs to know about one title
#[derive(Debug, Clone)]
pub struct TitleAccess {
    pub created_by: Uuid,
    pub view_policy: Option<AccessPolicy>,
    pub edit_policy: Option<AccessPolicy>,
    pub evaluation_enabled: bool,
    pub assigned: HashSet<Uuid>,
}

impl TitleAccess {
    pub fn from_title(title: &Title, assignments: &[TitleUser]) -> Self {
        Self {
            created_by: title.created_by,
            view_policy: title.view_policy(),
            edit_policy: title.edit_policy(),
            evaluation_enabled: title.evaluation_enabled,
            assigned: assignments.iter().map(|a| a.user_id).collect(),
        }
    }

    pub fn is_assigned(&self, user_id: Uuid) -> bool {
        self.assigned.contains(&user_id)
    }

    fn allows(&self, policy: Option<AccessPolicy>, actor: &Actor) -> bool {
        match policy {
            Some(AccessPolicy::All) => true,
            Some(AccessPolicy::Creator) => self.created_by == actor.user_id,
            Some(AccessPolicy::Assigned) => self.is_assigned(actor.user_id),
            None => false,
        }
    }
}

pub fn can_view(actor: &Actor, access: &TitleAccess) -> bool {
    actor.is_admin() || access.allows(access.view_policy, actor)
}

pub fn can_edit(actor: &Actor, access: &TitleAccess) -> bool {
    actor.is_admin() || access.allows(access.edit_policy, actor)
}

/// Assignment alone grants evaluation; the view/edit policies are not consulted.
pub fn can_evaluate(actor: &Actor, access: &TitleAccess) -> bool {
    if !access.evaluation_enabled {
        return false;
    }
    actor.is_admin() || access.is_assigned(actor.user_id)
}

/// Kind of access being requested, used in messages and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    View,
    Edit,
    Evaluate,
}

impl AccessKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessKind::View => "view",
            AccessKind::Edit => "edit",
            AccessKind::Evaluate => "evaluate",
        }
    }

    pub fn check(self, actor: &Actor, access: &TitleAccess) -> bool {
        match self {
            AccessKind::View => can_view(actor, access),
            AccessKind::Edit => can_edit(actor, access),
            AccessKind::Evaluate => can_evaluate(actor, access),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access(view: Option<AccessPolicy>, edit: Option<AccessPolicy>, assigned: &[Uuid]) -> TitleAccess {
        TitleAccess {
            created_by: Uuid::from_u128(1),
            view_policy: view,
            edit_policy: edit,
            evaluation_enabled: true,
            assigned: assigned.iter().copied().collect(),
        }
    }

    #[test]
    fn test_admin_sees_everything() {
        let admin = Actor::new(Uuid::from_u128(99), Permission::Admin);
        let title = access(None, None, &[]);
        assert!(can_view(&admin, &title));
        assert!(can_edit(&admin, &title));
    }

    #[test]
    fn test_assigned_policy_matches_assignment_list() {
        let assigned_user = Uuid::from_u128(2);
        let outsider = Uuid::from_u128(3);
        let title = access(Some(AccessPolicy::Assigned), Some(AccessPolicy::Assigned), &[assigned_user]);

        for permission in [Permission::General, Permission::Viewer] {
            assert!(can_view(&Actor::new(assigned_user, permission), &title));
            assert!(!can_view(&Actor::new(outsider, permission), &title));
        }
        assert!(can_view(&Actor::new(outsider, Permission::Admin), &title));
    }

    #[test]
    fn test_creator_policy() {
        let creator = Actor::new(Uuid::from_u128(1), Permission::General);
        let other = Actor::new(Uuid::from_u128(5), Permission::General);
        let title = access(Some(AccessPolicy::All), Some(AccessPolicy::Creator), &[other.user_id]);

        assert!(can_view(&other, &title));
        assert!(can_edit(&creator, &title));
        assert!(!can_edit(&other, &title));
    }

    #[test]
    fn test_unset_policy_denies() {
        let creator = Actor::new(Uuid::from_u128(1), Permission::General);
        let title = access(None, None, &[creator.user_id]);
        assert!(!can_view(&creator, &title));
        assert!(!can_edit(&creator, &title));
    }

    #[test]
    fn test_evaluate_requires_assignment_not_policy() {
        let assigned = Actor::new(Uuid::from_u128(2), Permission::Viewer);
        let creator = Actor::new(Uuid::from_u128(1), Permission::General);
        let title = access(Some(AccessPolicy::All), Some(AccessPolicy::All), &[assigned.user_id]);

        assert!(can_evaluate(&assigned, &title));
        assert!(!can_evaluate(&creator, &title));
    }

    #[test]
    fn test_evaluation_disabled_blocks_admin() {
        let admin = Actor::new(Uuid::from_u128(9), Permission::Admin);
        let mut title = access(Some(AccessPolicy::All), Some(AccessPolicy::All), &[admin.user_id]);
        title.evaluation_enabled = false;
        assert!(!can_evaluate(&admin, &title));
        assert!(!AccessKind::Evaluate.check(&admin, &title));
    }
}
