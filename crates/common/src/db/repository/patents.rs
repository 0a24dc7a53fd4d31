//! Patent records

use super::classifications::regenerate_classifications;
use super::{Page, Repository};
use crate::db::models::*;
use crate::errors::Result;
use crate::fields::PatentFields;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

/// A patent row waiting to be written under some title
#[derive(Debug, Clone, Default)]
pub struct NewPatent {
    pub fields: PatentFields,
    pub created_by: Option<Uuid>,
}

impl NewPatent {
    pub fn new(fields: PatentFields, created_by: Option<Uuid>) -> Self {
        Self { fields, created_by }
    }

    /// Copy of a stored patent for another title. The evaluation status
    /// starts over; evaluations themselves are never copied.
    pub fn copy_of(patent: &Patent, created_by: Uuid) -> Self {
        Self {
            fields: PatentFields {
                patent_no: patent.patent_no.clone(),
                application_no: patent.application_no.clone(),
                application_date: patent.application_date,
                publication_no: patent.publication_no.clone(),
                publication_date: patent.publication_date,
                registration_no: patent.registration_no.clone(),
                registration_date: patent.registration_date,
                invention_title: patent.invention_title.clone(),
                applicant: patent.applicant.clone(),
                inventor: patent.inventor.clone(),
                ipc: patent.ipc.clone(),
                abstract_text: patent.abstract_text.clone(),
                claims: patent.claims.clone(),
                legal_status: patent.legal_status.clone(),
                evaluation_status: None,
                memo: patent.memo.clone(),
            },
            created_by: Some(created_by),
        }
    }

    fn into_active(self, title_id: Uuid) -> PatentActiveModel {
        let now = chrono::Utc::now();
        let f = self.fields;
        PatentActiveModel {
            id: Set(Uuid::new_v4()),
            title_id: Set(title_id),
            patent_no: Set(f.patent_no),
            application_no: Set(f.application_no),
            application_date: Set(f.application_date),
            publication_no: Set(f.publication_no),
            publication_date: Set(f.publication_date),
            registration_no: Set(f.registration_no),
            registration_date: Set(f.registration_date),
            invention_title: Set(f.invention_title),
            applicant: Set(f.applicant),
            inventor: Set(f.inventor),
            ipc: Set(f.ipc),
            abstract_text: Set(f.abstract_text),
            claims: Set(f.claims),
            legal_status: Set(f.legal_status),
            evaluation_status: Set(f
                .evaluation_status
                .unwrap_or_else(|| STATUS_UNEVALUATED.to_string())),
            memo: Set(f.memo),
            created_by: Set(self.created_by),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
    }
}

/// Insert one patent and its classification rows on `conn`
pub(super) async fn insert_patent<C>(conn: &C, title_id: Uuid, new: NewPatent) -> Result<Patent>
where
    C: ConnectionTrait,
{
    let patent = new.into_active(title_id).insert(conn).await?;
    regenerate_classifications(conn, &patent).await?;
    Ok(patent)
}

/// Apply every present field of `fields` onto an active model
pub fn apply_fields(active: &mut PatentActiveModel, fields: PatentFields) {
    macro_rules! assign_text {
        ($($name:ident),*) => {
            $(if let Some(value) = fields.$name { active.$name = Set(Some(value)); })*
        };
    }
    assign_text!(
        patent_no,
        application_no,
        publication_no,
        registration_no,
        invention_title,
        applicant,
        inventor,
        ipc,
        abstract_text,
        claims,
        legal_status,
        memo
    );
    if let Some(date) = fields.application_date {
        active.application_date = Set(Some(date));
    }
    if let Some(date) = fields.publication_date {
        active.publication_date = Set(Some(date));
    }
    if let Some(date) = fields.registration_date {
        active.registration_date = Set(Some(date));
    }
    if let Some(status) = fields.evaluation_status {
        active.evaluation_status = Set(status);
    }
}

impl Repository {
    // ========================================================================
    // Patent Operations
    // ========================================================================

    pub async fn find_patent(&self, id: Uuid) -> Result<Option<Patent>> {
        Ok(PatentEntity::find_by_id(id).one(self.conn()).await?)
    }

    pub async fn find_patents(&self, ids: &[Uuid]) -> Result<Vec<Patent>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(PatentEntity::find()
            .filter(PatentColumn::Id.is_in(ids.iter().copied()))
            .all(self.conn())
            .await?)
    }

    /// Patents of a title, optionally narrowed to one evaluation status
    pub async fn list_patents(
        &self,
        title_id: Uuid,
        status: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> Result<Page<Patent>> {
        let mut query = PatentEntity::find().filter(PatentColumn::TitleId.eq(title_id));
        if let Some(status) = status {
            query = query.filter(PatentColumn::EvaluationStatus.eq(status));
        }

        let paginator = query
            .order_by_asc(PatentColumn::CreatedAt)
            .order_by_asc(PatentColumn::Id)
            .paginate(self.conn(), per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(Page::new(items, total, page, per_page))
    }

    /// Every patent of the given titles, oldest first within each title
    pub async fn patents_of_titles(&self, title_ids: &[Uuid]) -> Result<Vec<Patent>> {
        if title_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(PatentEntity::find()
            .filter(PatentColumn::TitleId.is_in(title_ids.iter().copied()))
            .order_by_asc(PatentColumn::CreatedAt)
            .order_by_asc(PatentColumn::Id)
            .all(self.conn())
            .await?)
    }

    pub async fn count_patents(&self, title_id: Uuid) -> Result<u64> {
        Ok(PatentEntity::find()
            .filter(PatentColumn::TitleId.eq(title_id))
            .count(self.conn())
            .await?)
    }

    /// Patents whose applicant contains `name`, limited to `title_ids`
    pub async fn search_patents_by_applicant(&self, name: &str, title_ids: &[Uuid]) -> Result<Vec<Patent>> {
        if title_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(PatentEntity::find()
            .filter(PatentColumn::Applicant.contains(name))
            .filter(PatentColumn::TitleId.is_in(title_ids.iter().copied()))
            .order_by_desc(PatentColumn::ApplicationDate)
            .order_by_asc(PatentColumn::Id)
            .all(self.conn())
            .await?)
    }

    /// Insert a patent with its classification rows
    pub async fn create_patent(&self, title_id: Uuid, new: NewPatent) -> Result<Patent> {
        let txn = self.begin().await?;
        let patent = insert_patent(&txn, title_id, new).await?;
        txn.commit().await?;
        Ok(patent)
    }

    /// Write `changes` over `previous`. Classification rows are rebuilt only
    /// when the classification date moved.
    pub async fn update_patent(&self, previous: &Patent, mut changes: PatentActiveModel) -> Result<Patent> {
        changes.updated_at = Set(chrono::Utc::now().into());

        let txn = self.begin().await?;
        let updated = changes.update(&txn).await?;
        if updated.classification_date() != previous.classification_date() {
            regenerate_classifications(&txn, &updated).await?;
        }
        txn.commit().await?;

        Ok(updated)
    }

    pub async fn set_patent_status(&self, patent: Patent, status: String) -> Result<Patent> {
        let mut active: PatentActiveModel = patent.into();
        active.evaluation_status = Set(status);
        active.updated_at = Set(chrono::Utc::now().into());
        Ok(active.update(self.conn()).await?)
    }

    pub async fn delete_patent(&self, id: Uuid) -> Result<bool> {
        let result = PatentEntity::delete_by_id(id).exec(self.conn()).await?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn stored() -> Patent {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().into();
        Patent {
            id: Uuid::from_u128(5),
            title_id: Uuid::from_u128(1),
            patent_no: Some("P-100".to_string()),
            application_no: Some("2020-1".to_string()),
            application_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            publication_no: None,
            publication_date: None,
            registration_no: None,
            registration_date: None,
            invention_title: Some("Widget".to_string()),
            applicant: Some("Acme".to_string()),
            inventor: None,
            ipc: None,
            abstract_text: None,
            claims: None,
            legal_status: None,
            evaluation_status: "重要".to_string(),
            memo: Some("keep".to_string()),
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_copy_resets_status() {
        let copy = NewPatent::copy_of(&stored(), Uuid::from_u128(9));
        assert_eq!(copy.fields.patent_no.as_deref(), Some("P-100"));
        assert_eq!(copy.fields.evaluation_status, None);
        assert_eq!(copy.created_by, Some(Uuid::from_u128(9)));

        let active = copy.into_active(Uuid::from_u128(2));
        assert_eq!(active.title_id.clone().unwrap(), Uuid::from_u128(2));
        assert_eq!(active.evaluation_status.clone().unwrap(), STATUS_UNEVALUATED);
        assert_eq!(active.memo.clone().unwrap().as_deref(), Some("keep"));
    }

    #[test]
    fn test_apply_fields_keeps_absent_columns() {
        let mut active: PatentActiveModel = stored().into();
        apply_fields(
            &mut active,
            PatentFields {
                applicant: Some("Globex".to_string()),
                publication_date: NaiveDate::from_ymd_opt(2021, 6, 1),
                ..Default::default()
            },
        );
        assert_eq!(active.applicant.clone().unwrap().as_deref(), Some("Globex"));
        assert_eq!(active.publication_date.clone().unwrap(), NaiveDate::from_ymd_opt(2021, 6, 1));
        assert_eq!(active.patent_no.clone().unwrap().as_deref(), Some("P-100"));
        assert!(!active.patent_no.is_set());
    }
}
