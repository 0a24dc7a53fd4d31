//! Authentication utilities
//!
//! Provides:
//! - Argon2 password hashing and verification
//! - JWT token generation and validation
//! - The [`AuthUser`] extractor, which re-loads the user on every request

use crate::db::models::{Permission, User};
use crate::db::Repository;
use crate::errors::{AppError, Result};
use crate::permission::Actor;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    pub username: String,

    /// Permission at issue time; requests use the stored value
    pub permission: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Longest token lifetime honoured; larger settings are capped (ten years)
pub const MAX_TOKEN_LIFETIME_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs.min(MAX_TOKEN_LIFETIME_SECS) as i64,
        }
    }

    pub fn expiration_secs(&self) -> i64 {
        self.expiration_secs
    }

    /// Generate a new JWT token for `user`
    pub fn generate_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            permission: user.permission_level().as_str().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })
    }
}

/// Hash a password into a salted PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal {
            message: format!("Failed to hash password: {}", e),
        })
}

/// Check a password against a stored PHC string. A malformed hash never matches.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

/// Extract the token from an `Authorization: Bearer ...` header
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Client address for the activity log: first `X-Forwarded-For` hop, then
/// `X-Real-IP`, then the socket peer
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or(real_ip)
        .map(String::from)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

/// What the extractor needs from application state
#[derive(Clone)]
pub struct AuthBackend {
    pub jwt: Arc<JwtManager>,
    pub repo: Repository,
}

/// The authenticated caller, loaded fresh from the database
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub actor: Actor,
    pub ip: Option<String>,
}

impl AuthUser {
    pub fn new(user: User) -> Self {
        let actor = Actor::new(user.id, user.permission_level());
        Self { user, actor, ip: None }
    }

    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip = ip;
        self
    }

    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn is_admin(&self) -> bool {
        self.actor.is_admin()
    }

    pub fn require_admin(&self) -> Result<()> {
        self.require_at_least(Permission::Admin)
    }

    pub fn require_at_least(&self, required: Permission) -> Result<()> {
        if self.actor.permission.at_least(required) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!("{} permission required", required)))
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    AuthBackend: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let backend = AuthBackend::from_ref(state);

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing Authorization header".to_string(),
            })?;

        let token = extract_bearer(auth_header).ok_or(AppError::InvalidToken)?;
        let claims = backend.jwt.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

        let user = backend
            .repo
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized {
                message: "User no longer exists".to_string(),
            })?;

        if !user.is_active {
            return Err(AppError::Unauthorized {
                message: "User is deactivated".to_string(),
            });
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(AuthUser::new(user).with_ip(client_ip(&parts.headers, peer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn user(permission: &str) -> User {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().into();
        User {
            id: Uuid::new_v4(),
            username: "tanaka".to_string(),
            display_name: "Tanaka".to_string(),
            email: None,
            password_hash: String::new(),
            department_id: None,
            permission: permission.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("s3cret!").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret!", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("s3cret!", "not a hash"));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_client_ip_precedence() {
        let peer: SocketAddr = "10.0.0.9:5000".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("10.0.0.9"));

        headers.insert("x-real-ip", "192.168.1.2".parse().unwrap());
        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("192.168.1.2"));

        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers, None).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);
        let u = user("一般");

        let token = manager.generate_token(&u).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, u.id.to_string());
        assert_eq!(claims.username, "tanaka");
        assert_eq!(claims.permission, "一般");
    }

    #[test]
    fn test_huge_expiry_is_capped() {
        let manager = JwtManager::new("test_secret", u64::MAX);
        assert_eq!(manager.expiration_secs(), MAX_TOKEN_LIFETIME_SECS as i64);

        let token = manager.generate_token(&user("一般")).unwrap();
        let claims = manager.validate_token(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, MAX_TOKEN_LIFETIME_SECS as i64);
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let token = JwtManager::new("a", 3600).generate_token(&user("一般")).unwrap();
        let err = JwtManager::new("b", 3600).validate_token(&token).unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[test]
    fn test_permission_gate() {
        let viewer = AuthUser::new(user("閲覧"));
        assert!(viewer.require_at_least(Permission::General).is_err());
        assert!(viewer.require_at_least(Permission::Viewer).is_ok());

        let admin = AuthUser::new(user("管理者"));
        assert!(admin.require_admin().is_ok());
        assert!(admin.is_admin());
    }
}
