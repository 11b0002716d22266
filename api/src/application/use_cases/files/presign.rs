use std::time::Duration;

use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::application::access::Principal;
use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::files_repository::FilesRepository;
use crate::application::ports::storage_port::{PresignedUpload, StoragePort};
use crate::application::use_cases::files::visible_file;
use crate::domain::access::ability::Action;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PresignUploadRequest {
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
    pub content_type: Option<String>,
}

pub struct PresignUpload<'a, S: StoragePort + ?Sized> {
    pub storage: &'a S,
    pub ttl: Duration,
}

impl<'a, S: StoragePort + ?Sized> PresignUpload<'a, S> {
    pub async fn execute(&self, owner_id: Uuid, req: &PresignUploadRequest) -> AppResult<PresignedUpload> {
        req.validate()?;
        self.storage
            .presign_put(owner_id, &req.filename, req.content_type.as_deref(), self.ttl)
            .await?
            .ok_or_else(|| AppError::code(ErrorCode::FilePresignUnsupported))
    }
}

pub struct PresignDownload<'a, R, S>
where
    R: FilesRepository + ?Sized,
    S: StoragePort + ?Sized,
{
    pub repo: &'a R,
    pub storage: &'a S,
    pub ttl: Duration,
}

impl<'a, R, S> PresignDownload<'a, R, S>
where
    R: FilesRepository + ?Sized,
    S: StoragePort + ?Sized,
{
    pub async fn execute(&self, principal: &Principal, id: Uuid) -> AppResult<String> {
        let file = visible_file(self.repo, principal, id, Action::Read).await?;
        self.storage
            .presign_get(&file.storage_key, self.ttl)
            .await?
            .ok_or_else(|| AppError::code(ErrorCode::FilePresignUnsupported))
    }
}
