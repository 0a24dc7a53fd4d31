//! CSV import handler

use axum::{
    extract::{Multipart, State},
    Json,
};
use patentdesk_common::{
    auth::AuthUser,
    errors::{AppError, Result},
    import::ImportReport,
    services::ImportUpload,
};
use uuid::Uuid;

use super::{field_bytes, field_text, missing_field, ok, ApiResponse};
use crate::AppState;

/// `POST /import/csv` with multipart parts `file`, `mapping` and `title_id`
pub async fn import_csv(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ImportReport>>> {
    let limit = state.config.uploads.max_upload_bytes;

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut mapping = None;
    let mut title_id = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| AppError::Validation {
        message: format!("malformed multipart body: {}", e),
        field: None,
    })? {
        match field.name().unwrap_or_default() {
            "file" => {
                let name = field.file_name().unwrap_or("upload.csv").to_string();
                file = Some((name, field_bytes(field, limit).await?));
            }
            "mapping" => mapping = Some(field_text(field).await?),
            "title_id" | "titleId" => {
                let raw = field_text(field).await?;
                let id = Uuid::parse_str(raw.trim()).map_err(|_| AppError::Validation {
                    message: format!("invalid title id '{}'", raw),
                    field: Some("title_id".to_string()),
                })?;
                title_id = Some(id);
            }
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let (file_name, bytes) = file.ok_or_else(|| missing_field("file"))?;
    let upload = ImportUpload {
        title_id: title_id.ok_or_else(|| missing_field("title_id"))?,
        file_name,
        bytes,
        mapping: mapping.ok_or_else(|| missing_field("mapping"))?,
    };

    Ok(ok(state.services.imports.import_csv(&user, upload).await?))
}
