//! User and department administration

use super::activity::ActivityService;
use crate::auth::{hash_password, AuthUser};
use crate::db::models::{Department, DepartmentActiveModel, Permission, User, UserActiveModel};
use crate::db::{NewDepartment, NewUser, Repository};
use crate::errors::{AppError, Result};
use sea_orm::Set;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub username: String,

    #[validate(length(min = 1, max = 200))]
    pub display_name: String,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(min = 8, max = 200))]
    pub password: String,

    pub department_id: Option<Uuid>,

    pub permission: Permission,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 200))]
    pub display_name: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    /// Reset the password without knowing the old one
    #[validate(length(min = 8, max = 200))]
    pub password: Option<String>,

    pub department_id: Option<Uuid>,

    pub permission: Option<Permission>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(length(max = 50))]
    pub code: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    repo: Repository,
    activity: ActivityService,
}

impl UserService {
    pub fn new(repo: Repository, activity: ActivityService) -> Self {
        Self { repo, activity }
    }

    /// Every user; the assignment screens need the full list
    pub async fn list(&self) -> Result<Vec<User>> {
        self.repo.list_users().await
    }

    pub async fn create(&self, actor: &AuthUser, request: CreateUserRequest) -> Result<User> {
        actor.require_admin()?;
        request.validate()?;

        let username = request.username.trim().to_string();
        if self.repo.find_user_by_username(&username).await?.is_some() {
            return Err(AppError::conflict(format!("username '{}' is already taken", username)));
        }
        if let Some(department_id) = request.department_id {
            self.ensure_department(department_id).await?;
        }

        let user = self
            .repo
            .create_user(NewUser {
                username,
                display_name: request.display_name,
                email: request.email,
                password_hash: hash_password(&request.password)?,
                department_id: request.department_id,
                permission: request.permission,
            })
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User created");
        self.activity
            .record(Some(actor), "user.create", "user", Some(user.id), Some(user.username.clone()))
            .await;

        Ok(user)
    }

    pub async fn update(&self, actor: &AuthUser, id: Uuid, request: UpdateUserRequest) -> Result<User> {
        actor.require_admin()?;
        request.validate()?;

        let user = self
            .repo
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))?;

        if id == actor.id() && (request.is_active == Some(false) || request.permission.is_some_and(|p| !p.is_admin())) {
            return Err(AppError::validation("administrators cannot demote or deactivate themselves"));
        }

        let mut active: UserActiveModel = user.into();
        if let Some(display_name) = request.display_name {
            active.display_name = Set(display_name);
        }
        if let Some(email) = request.email {
            active.email = Set(Some(email));
        }
        if let Some(password) = request.password {
            active.password_hash = Set(hash_password(&password)?);
        }
        if let Some(department_id) = request.department_id {
            self.ensure_department(department_id).await?;
            active.department_id = Set(Some(department_id));
        }
        if let Some(permission) = request.permission {
            active.permission = Set(permission.as_str().to_string());
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }

        let user = self.repo.update_user(active).await?;

        tracing::info!(user_id = %user.id, "User updated");
        self.activity
            .record(Some(actor), "user.update", "user", Some(user.id), None)
            .await;

        Ok(user)
    }

    /// Users own titles and evaluations, so removal deactivates the account
    pub async fn deactivate(&self, actor: &AuthUser, id: Uuid) -> Result<User> {
        actor.require_admin()?;
        if id == actor.id() {
            return Err(AppError::validation("administrators cannot deactivate themselves"));
        }

        let user = self
            .repo
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))?;

        let mut active: UserActiveModel = user.into();
        active.is_active = Set(false);
        let user = self.repo.update_user(active).await?;

        tracing::info!(user_id = %user.id, "User deactivated");
        self.activity
            .record(Some(actor), "user.deactivate", "user", Some(user.id), None)
            .await;

        Ok(user)
    }

    async fn ensure_department(&self, id: Uuid) -> Result<Department> {
        self.repo
            .find_department(id)
            .await?
            .ok_or_else(|| AppError::not_found("Department", id))
    }
}

#[derive(Clone)]
pub struct DepartmentService {
    repo: Repository,
    activity: ActivityService,
}

impl DepartmentService {
    pub fn new(repo: Repository, activity: ActivityService) -> Self {
        Self { repo, activity }
    }

    pub async fn list(&self) -> Result<Vec<Department>> {
        self.repo.list_departments().await
    }

    pub async fn create(&self, actor: &AuthUser, request: DepartmentRequest) -> Result<Department> {
        actor.require_admin()?;
        request.validate()?;

        let name = request.name.trim().to_string();
        if self.repo.find_department_by_name(&name).await?.is_some() {
            return Err(AppError::conflict(format!("department '{}' already exists", name)));
        }

        let department = self
            .repo
            .create_department(NewDepartment { name, code: request.code })
            .await?;

        self.activity
            .record(Some(actor), "department.create", "department", Some(department.id), Some(department.name.clone()))
            .await;

        Ok(department)
    }

    pub async fn update(&self, actor: &AuthUser, id: Uuid, request: DepartmentRequest) -> Result<Department> {
        actor.require_admin()?;
        request.validate()?;

        let department = self
            .repo
            .find_department(id)
            .await?
            .ok_or_else(|| AppError::not_found("Department", id))?;

        let name = request.name.trim().to_string();
        if let Some(existing) = self.repo.find_department_by_name(&name).await? {
            if existing.id != id {
                return Err(AppError::conflict(format!("department '{}' already exists", name)));
            }
        }

        let mut active: DepartmentActiveModel = department.into();
        active.name = Set(name);
        active.code = Set(request.code);
        let department = self.repo.update_department(active).await?;

        self.activity
            .record(Some(actor), "department.update", "department", Some(department.id), None)
            .await;

        Ok(department)
    }

    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> Result<()> {
        actor.require_admin()?;

        if !self.repo.delete_department(id).await? {
            return Err(AppError::not_found("Department", id));
        }

        self.activity
            .record(Some(actor), "department.delete", "department", Some(id), None)
            .await;

        Ok(())
    }
}
