//! Files attached to titles

use super::access::AccessService;
use super::activity::ActivityService;
use crate::auth::AuthUser;
use crate::db::models::{Attachment, Title};
use crate::db::{NewAttachment, Repository};
use crate::errors::{AppError, Result};
use crate::uploads::{sanitize_file_name, UploadStore};
use uuid::Uuid;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Bytes of a stored attachment with the metadata needed to serve them
#[derive(Debug)]
pub struct AttachmentDownload {
    pub attachment: Attachment,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct AttachmentService {
    repo: Repository,
    access: AccessService,
    activity: ActivityService,
    uploads: UploadStore,
}

impl AttachmentService {
    pub fn new(repo: Repository, access: AccessService, activity: ActivityService, uploads: UploadStore) -> Self {
        Self {
            repo,
            access,
            activity,
            uploads,
        }
    }

    async fn find(&self, id: Uuid) -> Result<Attachment> {
        self.repo
            .find_attachment(id)
            .await?
            .ok_or_else(|| AppError::not_found("Attachment", id))
    }

    /// Store the file and record it. The file is removed again if the row
    /// cannot be written.
    pub async fn upload(
        &self,
        user: &AuthUser,
        title_id: Uuid,
        file_name: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<Attachment> {
        let title = self.access.ensure_edit(user, title_id).await?;

        let original_name = sanitize_file_name(file_name);
        let stored = self.uploads.store(&original_name, bytes).await?;

        let mime_type = content_type
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string();

        let attachment = self
            .repo
            .create_attachment(NewAttachment {
                title_id: title.id,
                original_name,
                stored_name: stored.stored_name().to_string(),
                size_bytes: stored.size() as i64,
                mime_type,
                uploaded_by: user.id(),
            })
            .await?;
        stored.keep();

        tracing::info!(
            attachment_id = %attachment.id,
            title_id = %title.id,
            size = attachment.size_bytes,
            "Attachment uploaded"
        );
        self.activity
            .record(
                Some(user),
                "attachment.upload",
                "attachment",
                Some(attachment.id),
                Some(attachment.original_name.clone()),
            )
            .await;

        Ok(attachment)
    }

    pub async fn list(&self, user: &AuthUser, title_id: Uuid) -> Result<Vec<Attachment>> {
        self.access.ensure_view(user, title_id).await?;
        self.repo.list_attachments(title_id).await
    }

    pub async fn get(&self, user: &AuthUser, id: Uuid) -> Result<Attachment> {
        let attachment = self.find(id).await?;
        self.access.ensure_view(user, attachment.title_id).await?;
        Ok(attachment)
    }

    pub async fn download(&self, user: &AuthUser, id: Uuid) -> Result<AttachmentDownload> {
        let attachment = self.get(user, id).await?;
        let path = self.uploads.path_of(&attachment.stored_name)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::error!(attachment_id = %id, path = %path.display(), "Attachment file missing");
                return Err(AppError::not_found("Attachment file", id));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(AttachmentDownload { attachment, bytes })
    }

    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> Result<()> {
        let attachment = self.find(id).await?;
        let title: Title = self.access.ensure_edit(user, attachment.title_id).await?;

        if !self.repo.delete_attachment(id).await? {
            return Err(AppError::not_found("Attachment", id));
        }
        self.uploads.remove(&attachment.stored_name).await?;

        tracing::info!(attachment_id = %id, title_id = %title.id, "Attachment deleted");
        self.activity
            .record(Some(user), "attachment.delete", "attachment", Some(id), Some(attachment.original_name))
            .await;

        Ok(())
    }
}
