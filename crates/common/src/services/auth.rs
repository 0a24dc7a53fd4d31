//! Login, password change and the bootstrap administrator

use super::activity::ActivityService;
use crate::auth::{hash_password, verify_password, AuthUser, JwtManager};
use crate::config::AuthConfig;
use crate::db::models::{Permission, User, UserActiveModel};
use crate::db::{NewUser, Repository};
use crate::errors::{AppError, Result};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 100))]
    pub username: String,

    #[validate(length(min = 1, max = 200))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,

    #[validate(length(min = 8, max = 200))]
    pub new_password: String,
}

pub struct AuthService {
    repo: Repository,
    jwt: Arc<JwtManager>,
    activity: ActivityService,
}

impl AuthService {
    pub fn new(repo: Repository, jwt: Arc<JwtManager>, activity: ActivityService) -> Self {
        Self { repo, jwt, activity }
    }

    /// Check credentials and issue a token. Unknown users, wrong passwords
    /// and deactivated accounts all get the same answer.
    pub async fn login(&self, request: LoginRequest, ip: Option<String>) -> Result<LoginResponse> {
        request.validate()?;

        let user = self.repo.find_user_by_username(request.username.trim()).await?;

        let user = match user {
            Some(user) if user.is_active && verify_password(&request.password, &user.password_hash) => user,
            other => {
                crate::metrics::record_login(false);
                tracing::warn!(username = %request.username, "Login rejected");
                self.activity
                    .record_anonymous("auth.login_failed", other.map(|u| u.id), ip, Some(request.username))
                    .await;
                return Err(AppError::Unauthorized {
                    message: "Invalid username or password".to_string(),
                });
            }
        };

        let token = self.jwt.generate_token(&user)?;

        crate::metrics::record_login(true);
        tracing::info!(user_id = %user.id, username = %user.username, "User logged in");
        self.activity
            .record_anonymous("auth.login", Some(user.id), ip, None)
            .await;

        Ok(LoginResponse {
            token,
            token_type: "Bearer",
            expires_in: self.jwt.expiration_secs(),
            user,
        })
    }

    /// Tokens are stateless; logout is recorded for the audit trail only
    pub async fn logout(&self, user: &AuthUser) {
        tracing::info!(user_id = %user.id(), "User logged out");
        self.activity
            .record(Some(user), "auth.logout", "user", Some(user.id()), None)
            .await;
    }

    pub async fn change_password(&self, user: &AuthUser, request: ChangePasswordRequest) -> Result<()> {
        request.validate()?;

        if !verify_password(&request.current_password, &user.user.password_hash) {
            return Err(AppError::Validation {
                message: "current password is incorrect".to_string(),
                field: Some("currentPassword".to_string()),
            });
        }

        let mut active: UserActiveModel = user.user.clone().into();
        active.password_hash = Set(hash_password(&request.new_password)?);
        self.repo.update_user(active).await?;

        tracing::info!(user_id = %user.id(), "Password changed");
        self.activity
            .record(Some(user), "auth.password_change", "user", Some(user.id()), None)
            .await;

        Ok(())
    }

    /// Create the first administrator when the user table is empty and a
    /// bootstrap password is configured. Returns whether one was created.
    pub async fn ensure_bootstrap_admin(&self, config: &AuthConfig) -> Result<bool> {
        let Some(password) = config.bootstrap_admin_password.as_deref() else {
            return Ok(false);
        };

        if self.repo.count_users().await? > 0 {
            return Ok(false);
        }

        let admin = self
            .repo
            .create_user(NewUser {
                username: config.bootstrap_admin_username.clone(),
                display_name: config.bootstrap_admin_username.clone(),
                email: None,
                password_hash: hash_password(password)?,
                department_id: None,
                permission: Permission::Admin,
            })
            .await?;

        tracing::info!(user_id = %admin.id, username = %admin.username, "Bootstrap administrator created");
        self.activity
            .record_anonymous("user.bootstrap", Some(admin.id), None, None)
            .await;

        Ok(true)
    }
}
