//! Title (patent portfolio / case) entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who may view or edit a title besides administrators
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicy {
    All,
    Creator,
    Assigned,
}

impl AccessPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessPolicy::All => "all",
            AccessPolicy::Creator => "creator",
            AccessPolicy::Assigned => "assigned",
        }
    }
}

impl fmt::Display for AccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(AccessPolicy::All),
            "creator" => Ok(AccessPolicy::Creator),
            "assigned" => Ok(AccessPolicy::Assigned),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "titles")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Six-digit zero-padded sequence number
    #[sea_orm(column_type = "Text", unique)]
    pub title_no: String,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub data_type: String,

    pub department_id: Option<Uuid>,

    pub created_by: Uuid,

    #[sea_orm(column_type = "Text", nullable)]
    pub view_permission: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub edit_permission: Option<String>,

    pub evaluation_enabled: bool,

    /// Patent status mirrors the latest evaluation
    pub main_evaluation: bool,

    pub single_patent_multiple_evaluations: bool,

    pub parent_id: Option<Uuid>,

    /// `YYYY/MM`
    #[sea_orm(column_type = "Text")]
    pub save_date: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

/// Width of the zero-padded title sequence number
pub const TITLE_NO_WIDTH: usize = 6;

/// Successor of the most recently created title's number.
///
/// `None` or an unparsable value restarts the sequence at `000001`.
pub fn next_title_no(latest: Option<&str>) -> String {
    let next = latest
        .and_then(|no| no.trim().parse::<u64>().ok())
        .map_or(1, |n| n + 1);
    format!("{:0width$}", next, width = TITLE_NO_WIDTH)
}

impl Model {
    /// `None` for unset or unrecognised values
    pub fn view_policy(&self) -> Option<AccessPolicy> {
        self.view_permission.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn edit_policy(&self) -> Option<AccessPolicy> {
        self.edit_permission.as_deref().and_then(|s| s.parse().ok())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id"
    )]
    Department,

    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id"
    )]
    Parent,

    #[sea_orm(has_many = "super::patent::Entity", on_delete = "Cascade")]
    Patents,

    #[sea_orm(has_many = "super::title_user::Entity", on_delete = "Cascade")]
    TitleUsers,

    #[sea_orm(has_many = "super::attachment::Entity", on_delete = "Cascade")]
    Attachments,
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl Related<super::patent::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Patents.def()
    }
}

impl Related<super::title_user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TitleUsers.def()
    }
}

impl Related<super::attachment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_title_no() {
        assert_eq!(next_title_no(Some("000041")), "000042");
        assert_eq!(next_title_no(Some("000999")), "001000");
        assert_eq!(next_title_no(None), "000001");
        assert_eq!(next_title_no(Some("abc")), "000001");
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("assigned".parse::<AccessPolicy>(), Ok(AccessPolicy::Assigned));
        assert!("everyone".parse::<AccessPolicy>().is_err());
    }
}
