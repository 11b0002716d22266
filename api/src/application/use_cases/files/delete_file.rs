use uuid::Uuid;

use crate::application::access::Principal;
use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::files_repository::FilesRepository;
use crate::application::ports::storage_port::StoragePort;
use crate::application::use_cases::files::visible_file;
use crate::domain::access::ability::Action;

pub struct DeleteFile<'a, R, S>
where
    R: FilesRepository + ?Sized,
    S: StoragePort + ?Sized,
{
    pub repo: &'a R,
    pub storage: &'a S,
}

impl<'a, R, S> DeleteFile<'a, R, S>
where
    R: FilesRepository + ?Sized,
    S: StoragePort + ?Sized,
{
    pub async fn execute(&self, principal: &Principal, id: Uuid) -> AppResult<()> {
        let file = visible_file(self.repo, principal, id, Action::Delete).await?;
        if !self.repo.soft_delete(file.id).await? {
            return Err(AppError::code(ErrorCode::FileNotFound));
        }
        if let Err(err) = self.storage.delete(&file.storage_key).await {
            tracing::warn!(error = ?err, file_id = %file.id, key = %file.storage_key, "delete_file_object_failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{MemoryDb, MemoryStorage, principal};
    use crate::application::use_cases::files::upload_file::UploadFile;
    use crate::domain::access::ability::{Rule, Subject};

    #[tokio::test]
    async fn delete_needs_ownership_or_ability() {
        let db = MemoryDb::default();
        let storage = MemoryStorage::default();
        let owner = Uuid::new_v4();
        let file = UploadFile {
            repo: &db,
            storage: &storage,
            max_bytes: 64,
        }
        .execute(owner, b"bytes".to_vec(), Some("a.bin".into()), None)
        .await
        .unwrap();
        let uc = DeleteFile {
            repo: &db,
            storage: &storage,
        };

        // read access is not enough to delete
        let reader = principal(Uuid::new_v4(), vec![Rule::can(Action::Read, Subject::File)]);
        let err = uc.execute(&reader, file.id).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::FileNotFound);

        uc.execute(&principal(owner, vec![]), file.id).await.unwrap();
        assert!(!storage.contains(&file.storage_key));
        let err = uc.execute(&principal(owner, vec![]), file.id).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::FileNotFound);
    }
}
