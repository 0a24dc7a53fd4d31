//! User entity and the three-level permission hierarchy

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Organisation-wide permission level.
///
/// Stored as the Japanese label. Ordering follows [`Permission::rank`]:
/// `管理者` > `一般` > `閲覧`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "管理者", alias = "admin")]
    Admin,
    #[serde(rename = "一般", alias = "general")]
    General,
    #[serde(rename = "閲覧", alias = "viewer")]
    Viewer,
}

impl Permission {
    pub const ALL: [Permission; 3] = [Permission::Admin, Permission::General, Permission::Viewer];

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Admin => "管理者",
            Permission::General => "一般",
            Permission::Viewer => "閲覧",
        }
    }

    /// Numeric ordinal used for comparisons
    pub fn rank(self) -> u8 {
        match self {
            Permission::Admin => 3,
            Permission::General => 2,
            Permission::Viewer => 1,
        }
    }

    pub fn is_admin(self) -> bool {
        self == Permission::Admin
    }

    pub fn at_least(self, required: Permission) -> bool {
        self >= required
    }
}

impl PartialOrd for Permission {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Permission {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPermission(pub String);

impl fmt::Display for UnknownPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown permission level: {}", self.0)
    }
}

impl std::error::Error for UnknownPermission {}

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "管理者" | "admin" => Ok(Permission::Admin),
            "一般" | "general" => Ok(Permission::General),
            "閲覧" | "viewer" => Ok(Permission::Viewer),
            other => Err(UnknownPermission(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text", unique)]
    pub username: String,

    #[sea_orm(column_type = "Text")]
    pub display_name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub email: Option<String>,

    /// Argon2 PHC string (salt embedded)
    #[serde(skip_serializing)]
    #[sea_orm(column_type = "Text")]
    pub password_hash: String,

    pub department_id: Option<Uuid>,

    #[sea_orm(column_type = "Text")]
    pub permission: String,

    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Unknown stored values degrade to the lowest level
    pub fn permission_level(&self) -> Permission {
        self.permission.parse().unwrap_or(Permission::Viewer)
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

    #[sea_orm(has_many = "super::title_user::Entity")]
    TitleUsers,
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl Related<super::title_user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TitleUsers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_ordering() {
        assert!(Permission::Admin > Permission::General);
        assert!(Permission::General > Permission::Viewer);
        assert!(Permission::Admin.at_least(Permission::Viewer));
        assert!(!Permission::Viewer.at_least(Permission::General));
    }

    #[test]
    fn test_permission_parse() {
        assert_eq!("管理者".parse::<Permission>(), Ok(Permission::Admin));
        assert_eq!("閲覧".parse::<Permission>(), Ok(Permission::Viewer));
        assert!("root".parse::<Permission>().is_err());
    }

    #[test]
    fn test_permission_serde_uses_labels() {
        let json = serde_json::to_string(&Permission::General).unwrap();
        assert_eq!(json, "\"一般\"");
    }
}
