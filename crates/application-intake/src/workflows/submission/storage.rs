use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::domain::{Attachment, Folder};

/// Generic object-storage surface used for archiving submissions.
#[async_trait]
pub trait StorageGateway: Debug + Send + Sync {
    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String, StorageError>;
    async fn create_file(
        &self,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        content: &[u8],
    ) -> Result<String, StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage operation failed: {0}")]
    Backend(String),
    #[error("storage client unavailable: {0}")]
    Unavailable(String),
    #[error("failed to create folder '{name}': {reason}")]
    FolderCreation { name: String, reason: String },
    #[error("failed to upload '{filename}': {reason}")]
    Upload { filename: String, reason: String },
}

impl StorageError {
    fn reason(self) -> String {
        match self {
            StorageError::Backend(reason) | StorageError::Unavailable(reason) => reason,
            other => other.to_string(),
        }
    }
}

/// Folder plus the ids of every file uploaded into it, in attachment order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedSubmission {
    pub folder: Folder,
    pub file_ids: Vec<String>,
}

/// Creates the submission folder under the configured parent and uploads attachments
/// into it one at a time.
///
/// Nothing is cleaned up on failure: a folder and any files uploaded before an error
/// stay in storage for manual follow-up.
#[derive(Debug)]
pub struct StorageOrchestrator<S> {
    gateway: Arc<S>,
    parent_folder_id: String,
}

impl<S> StorageOrchestrator<S>
where
    S: StorageGateway + 'static,
{
    pub fn new(gateway: Arc<S>, parent_folder_id: impl Into<String>) -> Self {
        Self {
            gateway,
            parent_folder_id: parent_folder_id.into(),
        }
    }

    pub async fn create_folder(&self, name: &str) -> Result<Folder, StorageError> {
        let id = self
            .gateway
            .create_folder(name, &self.parent_folder_id)
            .await
            .map_err(|err| StorageError::FolderCreation {
                name: name.to_string(),
                reason: err.reason(),
            })?;

        info!(folder_id = %id, parent_id = %self.parent_folder_id, "submission folder created");
        Ok(Folder {
            id,
            name: name.to_string(),
            parent_id: self.parent_folder_id.clone(),
        })
    }

    pub async fn upload_file(
        &self,
        folder: &Folder,
        attachment: &Attachment,
    ) -> Result<String, StorageError> {
        let file_id = self
            .gateway
            .create_file(
                &attachment.filename,
                &folder.id,
                &attachment.mime_type,
                &attachment.content,
            )
            .await
            .map_err(|err| StorageError::Upload {
                filename: attachment.filename.clone(),
                reason: err.reason(),
            })?;

        debug!(
            folder_id = %folder.id,
            file_id = %file_id,
            bytes = attachment.content.len(),
            "attachment uploaded"
        );
        Ok(file_id)
    }

    /// Folder first, then uploads in order; the first failed upload stops the rest.
    pub async fn archive(
        &self,
        folder_name: &str,
        attachments: &[Attachment],
    ) -> Result<ArchivedSubmission, StorageError> {
        let folder = self.create_folder(folder_name).await?;

        let mut file_ids = Vec::with_capacity(attachments.len());
        for (index, attachment) in attachments.iter().enumerate() {
            match self.upload_file(&folder, attachment).await {
                Ok(file_id) => file_ids.push(file_id),
                Err(err) => {
                    warn!(
                        folder_id = %folder.id,
                        uploaded = index,
                        skipped = attachments.len() - index - 1,
                        "upload failed; leaving partial folder in place"
                    );
                    return Err(err);
                }
            }
        }

        Ok(ArchivedSubmission { folder, file_ids })
    }
}
