//! Patent filing record owned by a title

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status of a patent nobody has assessed yet
pub const STATUS_UNEVALUATED: &str = "未評価";

/// Status of an assessed patent
pub const STATUS_EVALUATED: &str = "評価済";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "patents")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub title_id: Uuid,

    #[sea_orm(column_type = "Text", nullable)]
    pub patent_no: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub application_no: Option<String>,

    pub application_date: Option<Date>,

    #[sea_orm(column_type = "Text", nullable)]
    pub publication_no: Option<String>,

    pub publication_date: Option<Date>,

    #[sea_orm(column_type = "Text", nullable)]
    pub registration_no: Option<String>,

    pub registration_date: Option<Date>,

    #[sea_orm(column_type = "Text", nullable)]
    pub invention_title: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub applicant: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub inventor: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub ipc: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub abstract_text: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub claims: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub legal_status: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub evaluation_status: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub memo: Option<String>,

    pub created_by: Option<Uuid>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Date the reporting buckets are derived from
    pub fn classification_date(&self) -> Option<Date> {
        self.publication_date.or(self.application_date)
    }

    /// Key used to collapse duplicates when titles are merged
    pub fn dedup_key(&self) -> String {
        match self.patent_no.as_deref().map(str::trim) {
            Some(no) if !no.is_empty() => no.to_string(),
            _ => self.id.to_string(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::title::Entity",
        from = "Column::TitleId",
        to = "super::title::Column::Id",
        on_delete = "Cascade"
    )]
    Title,

    #[sea_orm(has_many = "super::evaluation::Entity", on_delete = "Cascade")]
    Evaluations,

    #[sea_orm(has_many = "super::patent_classification::Entity", on_delete = "Cascade")]
    Classifications,
}

impl Related<super::title::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Title.def()
    }
}

impl Related<super::evaluation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Evaluations.def()
    }
}

impl Related<super::patent_classification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Classifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
