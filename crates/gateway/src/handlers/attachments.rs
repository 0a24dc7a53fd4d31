//! Attachment handlers

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use patentdesk_common::{
    auth::AuthUser,
    db::models::Attachment,
    errors::{AppError, Result},
    services::attachments::DEFAULT_MIME_TYPE,
};
use uuid::Uuid;

use super::{field_bytes, missing_field, ok, ApiResponse};
use crate::AppState;

/// `POST /titles/{id}/attachments` with one multipart part `file`
pub async fn upload_attachment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(title_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Attachment>>)> {
    let limit = state.config.uploads.max_upload_bytes;

    while let Some(field) = multipart.next_field().await.map_err(|e| AppError::Validation {
        message: format!("malformed multipart body: {}", e),
        field: None,
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("attachment").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field_bytes(field, limit).await?;

        let attachment = state
            .services
            .attachments
            .upload(&user, title_id, &file_name, content_type.as_deref(), &bytes)
            .await?;
        return Ok((StatusCode::CREATED, ok(attachment)));
    }

    Err(missing_field("file"))
}

pub async fn list_attachments(
    State(state): State<AppState>,
    user: AuthUser,
    Path(title_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Attachment>>>> {
    Ok(ok(state.services.attachments.list(&user, title_id).await?))
}

pub async fn get_attachment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Attachment>>> {
    Ok(ok(state.services.attachments.get(&user, id).await?))
}

pub async fn download_attachment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let download = state.services.attachments.download(&user, id).await?;
    let attachment = download.attachment;

    let content_type = HeaderValue::from_str(&attachment.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_MIME_TYPE));
    let disposition = HeaderValue::from_str(&content_disposition(&attachment.original_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [(header::CONTENT_TYPE, content_type), (header::CONTENT_DISPOSITION, disposition)],
        download.bytes,
    )
        .into_response())
}

pub async fn delete_attachment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.services.attachments.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `attachment` disposition with an ASCII fallback name and the RFC 5987
/// UTF-8 form for everything else
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();

    let mut encoded = String::with_capacity(file_name.len() * 3);
    for byte in file_name.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }

    format!("attachment; filename=\"{}\"; filename*=UTF-8''{}", fallback, encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("report.pdf"),
            "attachment; filename=\"report.pdf\"; filename*=UTF-8''report.pdf"
        );
    }

    #[test]
    fn test_content_disposition_encodes_utf8() {
        let value = content_disposition("明細書 v2.pdf");
        assert!(value.starts_with("attachment; filename=\"____v2.pdf\""));
        assert!(value.ends_with("filename*=UTF-8''%E6%98%8E%E7%B4%B0%E6%9B%B8%20v2.pdf"));
        assert!(HeaderValue::from_str(&value).is_ok());
    }
}
