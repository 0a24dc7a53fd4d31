//! Classification handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use patentdesk_common::{
    auth::AuthUser,
    classification::ClassificationType,
    errors::{AppError, Result},
    services::{ClassificationSummary, ReclassifyResult},
};
use serde::Deserialize;
use uuid::Uuid;

use super::{ok, ApiResponse};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ClassificationQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ClassificationQuery {
    fn kind(&self) -> Result<Option<ClassificationType>> {
        self.kind
            .as_deref()
            .map(|k| {
                k.parse().map_err(|message| AppError::Validation {
                    message,
                    field: Some("type".to_string()),
                })
            })
            .transpose()
    }
}

/// `GET /titles/{id}/classification?type=year|month|week`
pub async fn title_classification(
    State(state): State<AppState>,
    user: AuthUser,
    Path(title_id): Path<Uuid>,
    Query(query): Query<ClassificationQuery>,
) -> Result<Json<ApiResponse<ClassificationSummary>>> {
    let summary = state
        .services
        .classifications
        .summary(&user, title_id, query.kind()?)
        .await?;
    Ok(ok(summary))
}

pub async fn auto_classify(
    State(state): State<AppState>,
    user: AuthUser,
    Path(title_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReclassifyResult>>> {
    Ok(ok(state.services.classifications.auto_classify(&user, title_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_is_rejected() {
        let query = ClassificationQuery {
            kind: Some("quarter".to_string()),
        };
        assert!(matches!(query.kind(), Err(AppError::Validation { .. })));

        let query = ClassificationQuery {
            kind: Some("week".to_string()),
        };
        assert_eq!(query.kind().unwrap(), Some(ClassificationType::Week));
    }
}
