//! Attachment rows

use super::Repository;
use crate::db::models::*;
use crate::errors::Result;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub title_id: Uuid,
    pub original_name: String,
    pub stored_name: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub uploaded_by: Uuid,
}

impl Repository {
    pub async fn create_attachment(&self, new: NewAttachment) -> Result<Attachment> {
        let attachment = AttachmentActiveModel {
            id: Set(Uuid::new_v4()),
            title_id: Set(new.title_id),
            original_name: Set(new.original_name),
            stored_name: Set(new.stored_name),
            size_bytes: Set(new.size_bytes),
            mime_type: Set(new.mime_type),
            uploaded_by: Set(new.uploaded_by),
            created_at: Set(chrono::Utc::now().into()),
        };

        Ok(attachment.insert(self.conn()).await?)
    }

    pub async fn find_attachment(&self, id: Uuid) -> Result<Option<Attachment>> {
        Ok(AttachmentEntity::find_by_id(id).one(self.conn()).await?)
    }

    pub async fn list_attachments(&self, title_id: Uuid) -> Result<Vec<Attachment>> {
        Ok(AttachmentEntity::find()
            .filter(AttachmentColumn::TitleId.eq(title_id))
            .order_by_desc(AttachmentColumn::CreatedAt)
            .all(self.conn())
            .await?)
    }

    pub async fn delete_attachment(&self, id: Uuid) -> Result<bool> {
        let result = AttachmentEntity::delete_by_id(id).exec(self.conn()).await?;
        Ok(result.rows_affected > 0)
    }
}
