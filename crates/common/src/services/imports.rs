//! CSV import into a title

use super::access::AccessService;
use super::activity::ActivityService;
use crate::auth::AuthUser;
use crate::db::{NewPatent, Repository};
use crate::errors::Result;
use crate::import::{delimiter_for, map_rows, ColumnMapping, ImportReport};
use crate::uploads::UploadStore;
use std::time::Instant;
use uuid::Uuid;

/// Parts of the multipart import request
#[derive(Debug)]
pub struct ImportUpload {
    pub title_id: Uuid,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mapping: String,
}

#[derive(Clone)]
pub struct ImportService {
    repo: Repository,
    access: AccessService,
    activity: ActivityService,
    uploads: UploadStore,
}

impl ImportService {
    pub fn new(repo: Repository, access: AccessService, activity: ActivityService, uploads: UploadStore) -> Self {
        Self {
            repo,
            access,
            activity,
            uploads,
        }
    }

    /// Import every mappable row. Header and mapping problems reject the
    /// whole file; row problems, including failed inserts, are reported per
    /// row. The stored upload is removed whichever way this returns.
    pub async fn import_csv(&self, user: &AuthUser, upload: ImportUpload) -> Result<ImportReport> {
        let started = Instant::now();

        let title = self.access.ensure_edit(user, upload.title_id).await?;
        let extension = self.uploads.check_import_extension(&upload.file_name)?;
        let mapping = ColumnMapping::from_json(&upload.mapping)?;

        let stored = self.uploads.store(&upload.file_name, &upload.bytes).await?;
        drop(upload.bytes);

        let contents = tokio::fs::read(stored.path()).await?;
        let mapped = map_rows(contents.as_slice(), delimiter_for(&extension), &mapping)?;

        let mut report = mapped.report;
        for (line, fields) in mapped.rows {
            match self
                .repo
                .create_patent(title.id, NewPatent::new(fields, Some(user.id())))
                .await
            {
                Ok(_) => report.record_success(),
                Err(e) => {
                    tracing::warn!(title_id = %title.id, row = line, error = %e, "Import row rejected by store");
                    report.record_failure(line, e.public_message());
                }
            }
        }
        report.errors.sort_by_key(|e| e.row);

        drop(stored);

        let elapsed = started.elapsed().as_secs_f64();
        crate::metrics::record_import(elapsed, report.imported, report.failed);
        tracing::info!(
            title_id = %title.id,
            file = %upload.file_name,
            imported = report.imported,
            failed = report.failed,
            elapsed_secs = elapsed,
            "CSV import finished"
        );
        self.activity
            .record(
                Some(user),
                "import.csv",
                "title",
                Some(title.id),
                Some(format!("{}: {} imported, {} failed", upload.file_name, report.imported, report.failed)),
            )
            .await;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UploadConfig;
    use crate::db::models::{Title, TitleUser, User};
    use crate::db::DbPool;
    use crate::errors::AppError;
    use chrono::{TimeZone, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn admin() -> AuthUser {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().into();
        AuthUser::new(User {
            id: Uuid::from_u128(1),
            username: "admin".to_string(),
            display_name: "admin".to_string(),
            email: None,
            password_hash: String::new(),
            department_id: None,
            permission: "管理者".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    fn title() -> Title {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().into();
        Title {
            id: Uuid::from_u128(10),
            title_no: "000010".to_string(),
            name: "t".to_string(),
            data_type: "patent".to_string(),
            department_id: None,
            created_by: Uuid::from_u128(1),
            view_permission: Some("all".to_string()),
            edit_permission: Some("creator".to_string()),
            evaluation_enabled: true,
            main_evaluation: false,
            single_patent_multiple_evaluations: false,
            parent_id: None,
            save_date: "2024/01".to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn service(db: MockDatabase, dir: &std::path::Path) -> ImportService {
        let repo = Repository::new(DbPool::from_connection(db.into_connection()));
        let uploads = UploadStore::new(&UploadConfig {
            dir: dir.to_path_buf(),
            max_upload_bytes: 1024,
            import_extensions: vec!["csv".to_string(), "tsv".to_string()],
        });
        ImportService::new(repo.clone(), AccessService::new(repo.clone()), ActivityService::new(repo), uploads)
    }

    #[tokio::test]
    async fn test_rejects_unsupported_extension_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![title()]])
            .append_query_results([Vec::<TitleUser>::new()]);

        let err = service(db, dir.path())
            .import_csv(
                &admin(),
                ImportUpload {
                    title_id: Uuid::from_u128(10),
                    file_name: "list.xlsx".to_string(),
                    bytes: b"a,b\n".to_vec(),
                    mapping: r#"{"patentNo":"a"}"#.to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnsupportedFileType { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_header_mismatch_removes_upload() {
        let dir = tempfile::tempdir().unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![title()]])
            .append_query_results([Vec::<TitleUser>::new()]);

        let err = service(db, dir.path())
            .import_csv(
                &admin(),
                ImportUpload {
                    title_id: Uuid::from_u128(10),
                    file_name: "list.csv".to_string(),
                    bytes: "番号,出願人\nP-1,Acme\n".as_bytes().to_vec(),
                    mapping: r#"{"patentNo":"特許番号"}"#.to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
