//! Evaluation entity: one user's assessment of one patent

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of an evaluation row. Deleted rows are kept for audit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationState {
    Active,
    Deleted,
}

impl EvaluationState {
    pub fn as_str(self) -> &'static str {
        match self {
            EvaluationState::Active => "active",
            EvaluationState::Deleted => "deleted",
        }
    }
}

impl From<&str> for EvaluationState {
    fn from(s: &str) -> Self {
        match s {
            "deleted" => EvaluationState::Deleted,
            _ => EvaluationState::Active,
        }
    }
}

impl From<EvaluationState> for String {
    fn from(state: EvaluationState) -> Self {
        state.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "evaluations")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub patent_id: Uuid,

    pub title_id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,

    pub score: Option<i32>,

    pub is_public: bool,

    #[sea_orm(column_type = "Text")]
    pub state: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn lifecycle(&self) -> EvaluationState {
        EvaluationState::from(self.state.as_str())
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle() == EvaluationState::Active
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::patent::Entity",
        from = "Column::PatentId",
        to = "super::patent::Column::Id",
        on_delete = "Cascade"
    )]
    Patent,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::patent::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Patent.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
