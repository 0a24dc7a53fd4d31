//! Derived reporting bucket rows (year / month / ISO week per patent)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "patent_classifications")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub patent_id: Uuid,

    pub title_id: Uuid,

    /// `year`, `month` or `week`
    #[sea_orm(column_type = "Text")]
    pub classification_type: String,

    #[sea_orm(column_type = "Text")]
    pub value: String,

    pub created_at: DateTimeWithTimeZone,
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
}

impl Related<super::patent::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Patent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
