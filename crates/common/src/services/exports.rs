//! Patent export for one title

use super::access::AccessService;
use super::activity::ActivityService;
use crate::auth::AuthUser;
use crate::db::Repository;
use crate::errors::Result;
use crate::export::{resolve_fields, to_csv, to_json, ExportFormat};
use crate::fields::{catalogue, FieldInfo};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    #[serde(alias = "title_id")]
    pub title_id: Uuid,

    /// Field keys; every field when absent
    pub fields: Option<Vec<String>>,

    #[serde(default)]
    pub format: ExportFormat,
}

/// Rendered export, ready for the transport layer
#[derive(Debug)]
pub enum ExportOutput {
    Csv { file_name: String, bytes: Vec<u8> },
    Json(Vec<serde_json::Map<String, serde_json::Value>>),
}

#[derive(Clone)]
pub struct ExportService {
    repo: Repository,
    access: AccessService,
    activity: ActivityService,
}

impl ExportService {
    pub fn new(repo: Repository, access: AccessService, activity: ActivityService) -> Self {
        Self { repo, access, activity }
    }

    pub fn fields(&self) -> Vec<FieldInfo> {
        catalogue()
    }

    pub async fn export(&self, user: &AuthUser, request: ExportRequest) -> Result<ExportOutput> {
        let fields = resolve_fields(request.fields.as_deref())?;
        let title = self.access.ensure_view(user, request.title_id).await?;
        let patents = self.repo.patents_of_titles(&[title.id]).await?;

        let output = match request.format {
            ExportFormat::Csv => ExportOutput::Csv {
                file_name: format!("title_{}.csv", title.title_no),
                bytes: to_csv(&patents, &fields)?,
            },
            ExportFormat::Json => ExportOutput::Json(to_json(&patents, &fields)),
        };

        tracing::info!(
            title_id = %title.id,
            patents = patents.len(),
            fields = fields.len(),
            format = ?request.format,
            "Title exported"
        );
        self.activity
            .record(
                Some(user),
                "export.data",
                "title",
                Some(title.id),
                Some(format!("{} patents", patents.len())),
            )
            .await;

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_to_csv() {
        let request: ExportRequest =
            serde_json::from_str(r#"{"title_id":"00000000-0000-0000-0000-000000000001"}"#).unwrap();
        assert_eq!(request.format, ExportFormat::Csv);
        assert!(request.fields.is_none());

        let request: ExportRequest = serde_json::from_str(
            r#"{"titleId":"00000000-0000-0000-0000-000000000001","fields":["patentNo"],"format":"json"}"#,
        )
        .unwrap();
        assert_eq!(request.format, ExportFormat::Json);
    }
}
