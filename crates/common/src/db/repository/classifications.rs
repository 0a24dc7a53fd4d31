//! Derived classification rows

use super::Repository;
use crate::classification::{classify, ClassificationType};
use crate::db::models::*;
use crate::errors::Result;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Serialize;
use uuid::Uuid;

/// Number of patents in one bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromQueryResult)]
pub struct ClassificationCount {
    pub value: String,
    pub count: i64,
}

/// Replace the classification rows of `patent`.
///
/// Runs on whatever connection it is given so callers can keep it inside the
/// transaction that wrote the patent. A patent without any date ends up with
/// no rows.
pub async fn regenerate_classifications<C>(conn: &C, patent: &Patent) -> Result<usize>
where
    C: ConnectionTrait,
{
    PatentClassificationEntity::delete_many()
        .filter(PatentClassificationColumn::PatentId.eq(patent.id))
        .exec(conn)
        .await?;

    let Some(date) = patent.classification_date() else {
        return Ok(0);
    };

    let now = chrono::Utc::now();
    let rows: Vec<PatentClassificationActiveModel> = classify(date)
        .into_iter()
        .map(|bucket| PatentClassificationActiveModel {
            id: Set(Uuid::new_v4()),
            patent_id: Set(patent.id),
            title_id: Set(patent.title_id),
            classification_type: Set(bucket.kind.as_str().to_string()),
            value: Set(bucket.value),
            created_at: Set(now.into()),
        })
        .collect();

    let written = PatentClassificationEntity::insert_many(rows)
        .exec_without_returning(conn)
        .await?;

    Ok(written as usize)
}

impl Repository {
    /// Rebuild every classification row of a title in one transaction
    pub async fn reclassify_title(&self, title_id: Uuid) -> Result<usize> {
        let txn = self.begin().await?;

        let patents = PatentEntity::find()
            .filter(PatentColumn::TitleId.eq(title_id))
            .all(&txn)
            .await?;

        let mut classified = 0;
        for patent in &patents {
            if regenerate_classifications(&txn, patent).await? > 0 {
                classified += 1;
            }
        }

        txn.commit().await?;

        Ok(classified)
    }

    /// Bucket counts for one classification type, ordered by bucket
    pub async fn classification_counts(
        &self,
        title_id: Uuid,
        kind: ClassificationType,
    ) -> Result<Vec<ClassificationCount>> {
        Ok(PatentClassificationEntity::find()
            .select_only()
            .column(PatentClassificationColumn::Value)
            .column_as(PatentClassificationColumn::Id.count(), "count")
            .filter(PatentClassificationColumn::TitleId.eq(title_id))
            .filter(PatentClassificationColumn::ClassificationType.eq(kind.as_str()))
            .group_by(PatentClassificationColumn::Value)
            .order_by_asc(PatentClassificationColumn::Value)
            .into_model::<ClassificationCount>()
            .all(self.conn())
            .await?)
    }

    pub async fn classifications_for_patent(&self, patent_id: Uuid) -> Result<Vec<PatentClassification>> {
        Ok(PatentClassificationEntity::find()
            .filter(PatentClassificationColumn::PatentId.eq(patent_id))
            .order_by_asc(PatentClassificationColumn::ClassificationType)
            .all(self.conn())
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbPool;
    use chrono::{NaiveDate, TimeZone, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;

    fn patent(publication: Option<NaiveDate>, application: Option<NaiveDate>) -> Patent {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().into();
        Patent {
            id: Uuid::from_u128(10),
            title_id: Uuid::from_u128(1),
            patent_no: Some("P-1".to_string()),
            application_no: None,
            application_date: application,
            publication_no: None,
            publication_date: publication,
            registration_no: None,
            registration_date: None,
            invention_title: None,
            applicant: None,
            inventor: None,
            ipc: None,
            abstract_text: None,
            claims: None,
            legal_status: None,
            evaluation_status: STATUS_UNEVALUATED.to_string(),
            memo: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_regenerate_writes_three_rows() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult { last_insert_id: 0, rows_affected: 3 },
                MockExecResult { last_insert_id: 0, rows_affected: 3 },
            ])
            .into_connection();

        let p = patent(NaiveDate::from_ymd_opt(2024, 12, 31), None);
        let written = regenerate_classifications(&db, &p).await.unwrap();
        assert_eq!(written, 3);

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 2);
        let insert = format!("{:?}", log[1]);
        assert!(insert.contains("2025-W01"));
        assert!(insert.contains("2024/12"));
    }

    #[tokio::test]
    async fn test_regenerate_without_date_only_deletes() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 0 }])
            .into_connection();

        let written = regenerate_classifications(&db, &patent(None, None)).await.unwrap();
        assert_eq!(written, 0);
        assert_eq!(db.into_transaction_log().len(), 1);
    }

    #[tokio::test]
    async fn test_classification_counts_query() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![
                BTreeMap::from([("value", Value::from("2023")), ("count", Value::from(4i64))]),
                BTreeMap::from([("value", Value::from("2024")), ("count", Value::from(2i64))]),
            ]])
            .into_connection();

        let repo = Repository::new(DbPool::from_connection(db));
        let counts = repo
            .classification_counts(Uuid::from_u128(1), ClassificationType::Year)
            .await
            .unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].count, 4);
    }
}
