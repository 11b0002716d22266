use uuid::Uuid;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::files_repository::{FilesRepository, NewStoredFile};
use crate::application::ports::storage_port::StoragePort;
use crate::domain::files::stored_file::StoredFile;

pub struct UploadFile<'a, R, S>
where
    R: FilesRepository + ?Sized,
    S: StoragePort + ?Sized,
{
    pub repo: &'a R,
    pub storage: &'a S,
    pub max_bytes: usize,
}

impl<'a, R, S> UploadFile<'a, R, S>
where
    R: FilesRepository + ?Sized,
    S: StoragePort + ?Sized,
{
    pub async fn execute(
        &self,
        owner_id: Uuid,
        bytes: Vec<u8>,
        orig_filename: Option<String>,
        content_type: Option<String>,
    ) -> AppResult<StoredFile> {
        if bytes.is_empty() {
            return Err(AppError::with_message(ErrorCode::FileInvalid, "file is empty"));
        }
        if bytes.len() > self.max_bytes {
            return Err(AppError::with_message(
                ErrorCode::FileTooLarge,
                format!("file exceeds the {} byte upload limit", self.max_bytes),
            ));
        }
        let content_type = content_type
            .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
            .or_else(|| {
                orig_filename
                    .as_deref()
                    .and_then(|name| mime_guess::from_path(name).first_raw())
                    .map(str::to_string)
            });

        let stored = self
            .storage
            .put(owner_id, orig_filename.as_deref(), content_type.as_deref(), &bytes)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, %owner_id, "store_file_failed");
                err
            })?;
        let inserted = self
            .repo
            .insert_file(NewStoredFile {
                owner_id,
                filename: stored.filename.clone(),
                content_type,
                size: stored.size,
                storage_key: stored.key.clone(),
                content_hash: stored.content_hash.clone(),
            })
            .await;
        match inserted {
            Ok(file) => Ok(file),
            Err(err) => {
                tracing::error!(error = ?err, %owner_id, key = %stored.key, "insert_file_failed");
                if let Err(cleanup) = self.storage.delete(&stored.key).await {
                    tracing::warn!(error = ?cleanup, key = %stored.key, "orphaned_object_cleanup_failed");
                }
                Err(err.into())
            }
        }
    }
}
