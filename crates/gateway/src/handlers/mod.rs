//! API handlers module

pub mod activity;
pub mod attachments;
pub mod auth;
pub mod classifications;
pub mod departments;
pub mod evaluations;
pub mod exports;
pub mod health;
pub mod imports;
pub mod patents;
pub mod titles;
pub mod users;

use axum::{
    extract::{multipart::Field, ConnectInfo, FromRequestParts},
    http::request::Parts,
    Json,
};
use patentdesk_common::{auth::client_ip, errors::AppError};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;

/// Success envelope: `{ "data": ... }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { data })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: Option<u64>,
    #[serde(alias = "per_page")]
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Caller address for unauthenticated routes
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIp(client_ip(&parts.headers, peer)))
    }
}

/// Read a multipart text part
pub async fn field_text(field: Field<'_>) -> Result<String, AppError> {
    let name = field.name().unwrap_or_default().to_string();
    field.text().await.map_err(|e| AppError::Validation {
        message: format!("unreadable multipart field: {}", e),
        field: Some(name),
    })
}

/// Read a multipart file part, stopping once it exceeds `limit`
pub async fn field_bytes(mut field: Field<'_>, limit: usize) -> Result<Vec<u8>, AppError> {
    let name = field.name().unwrap_or_default().to_string();
    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| AppError::Validation {
        message: format!("unreadable multipart field: {}", e),
        field: Some(name.clone()),
    })? {
        if bytes.len() + chunk.len() > limit {
            return Err(AppError::PayloadTooLarge {
                size: bytes.len() + chunk.len(),
                limit,
            });
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

pub fn missing_field(name: &str) -> AppError {
    AppError::Validation {
        message: format!("multipart field '{}' is required", name),
        field: Some(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_client_ip_prefers_forwarded_header() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let ClientIp(ip) = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ip.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ApiResponse { data: 3 }).unwrap();
        assert_eq!(body, serde_json::json!({ "data": 3 }));
    }
}
