//! Users and departments

use super::Repository;
use crate::db::models::*;
use crate::errors::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub department_id: Option<Uuid>,
    pub permission: Permission,
}

#[derive(Debug, Clone)]
pub struct NewDepartment {
    pub name: String,
    pub code: Option<String>,
}

impl Repository {
    // ========================================================================
    // User Operations
    // ========================================================================

    pub async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(UserEntity::find_by_id(id).one(self.conn()).await?)
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(UserEntity::find()
            .filter(UserColumn::Username.eq(username))
            .one(self.conn())
            .await?)
    }

    pub async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(UserEntity::find()
            .filter(UserColumn::Id.is_in(ids.iter().copied()))
            .all(self.conn())
            .await?)
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        Ok(UserEntity::find()
            .order_by_asc(UserColumn::Username)
            .all(self.conn())
            .await?)
    }

    pub async fn count_users(&self) -> Result<u64> {
        Ok(UserEntity::find().count(self.conn()).await?)
    }

    pub async fn create_user(&self, new: NewUser) -> Result<User> {
        let now = chrono::Utc::now();

        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(new.username),
            display_name: Set(new.display_name),
            email: Set(new.email),
            password_hash: Set(new.password_hash),
            department_id: Set(new.department_id),
            permission: Set(new.permission.as_str().to_string()),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        Ok(user.insert(self.conn()).await?)
    }

    /// Persist the changed columns of `user`
    pub async fn update_user(&self, mut user: UserActiveModel) -> Result<User> {
        user.updated_at = Set(chrono::Utc::now().into());
        Ok(user.update(self.conn()).await?)
    }

    // ========================================================================
    // Department Operations
    // ========================================================================

    pub async fn find_department(&self, id: Uuid) -> Result<Option<Department>> {
        Ok(DepartmentEntity::find_by_id(id).one(self.conn()).await?)
    }

    pub async fn find_department_by_name(&self, name: &str) -> Result<Option<Department>> {
        Ok(DepartmentEntity::find()
            .filter(DepartmentColumn::Name.eq(name))
            .one(self.conn())
            .await?)
    }

    pub async fn list_departments(&self) -> Result<Vec<Department>> {
        Ok(DepartmentEntity::find()
            .order_by_asc(DepartmentColumn::Name)
            .all(self.conn())
            .await?)
    }

    pub async fn create_department(&self, new: NewDepartment) -> Result<Department> {
        let now = chrono::Utc::now();

        let department = DepartmentActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new.name),
            code: Set(new.code),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        Ok(department.insert(self.conn()).await?)
    }

    pub async fn update_department(&self, mut department: DepartmentActiveModel) -> Result<Department> {
        department.updated_at = Set(chrono::Utc::now().into());
        Ok(department.update(self.conn()).await?)
    }

    /// Users and titles of the department keep existing with no department
    pub async fn delete_department(&self, id: Uuid) -> Result<bool> {
        let result = DepartmentEntity::delete_by_id(id).exec(self.conn()).await?;
        Ok(result.rows_affected > 0)
    }
}
