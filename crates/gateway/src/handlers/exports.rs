//! Export handlers

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use patentdesk_common::{
    auth::AuthUser,
    errors::Result,
    fields::FieldInfo,
    services::{ExportOutput, ExportRequest},
};

use super::{ok, ApiResponse};
use crate::AppState;

pub async fn export_fields(State(state): State<AppState>, _user: AuthUser) -> Json<ApiResponse<Vec<FieldInfo>>> {
    ok(state.services.exports.fields())
}

/// CSV comes back as a download; JSON inside the usual envelope
pub async fn export_data(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ExportRequest>,
) -> Result<Response> {
    let response = match state.services.exports.export(&user, request).await? {
        ExportOutput::Csv { file_name, bytes } => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file_name),
                ),
            ],
            bytes,
        )
            .into_response(),
        ExportOutput::Json(rows) => ok(rows).into_response(),
    };
    Ok(response)
}
