use uuid::Uuid;

use crate::application::access::Principal;
use crate::application::errors::AppResult;
use crate::application::pagination::{Page, PageRequest};
use crate::application::ports::files_repository::FilesRepository;
use crate::application::ports::storage_port::StoragePort;
use crate::application::use_cases::files::visible_file;
use crate::domain::access::ability::Action;
use crate::domain::files::stored_file::StoredFile;

pub struct ListFiles<'a, R: FilesRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: FilesRepository + ?Sized> ListFiles<'a, R> {
    pub async fn execute(&self, owner_id: Uuid, page: PageRequest) -> AppResult<Page<StoredFile>> {
        Ok(self.repo.list_for_owner(owner_id, page).await?)
    }
}

pub struct GetFile<'a, R: FilesRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: FilesRepository + ?Sized> GetFile<'a, R> {
    pub async fn execute(&self, principal: &Principal, id: Uuid) -> AppResult<StoredFile> {
        visible_file(self.repo, principal, id, Action::Read).await
    }
}

pub struct ReadFileContent<'a, R, S>
where
    R: FilesRepository + ?Sized,
    S: StoragePort + ?Sized,
{
    pub repo: &'a R,
    pub storage: &'a S,
}

impl<'a, R, S> ReadFileContent<'a, R, S>
where
    R: FilesRepository + ?Sized,
    S: StoragePort + ?Sized,
{
    pub async fn execute(&self, principal: &Principal, id: Uuid) -> AppResult<(StoredFile, Vec<u8>)> {
        let file = visible_file(self.repo, principal, id, Action::Read).await?;
        let bytes = self.storage.get(&file.storage_key).await?;
        Ok((file, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::ErrorCode;
    use crate::application::testing::{MemoryDb, MemoryStorage, admin, principal};
    use crate::application::use_cases::files::upload_file::UploadFile;

    #[tokio::test]
    async fn owners_and_readers_see_files_others_do_not() {
        let db = MemoryDb::default();
        let storage = MemoryStorage::default();
        let owner = Uuid::new_v4();
        let file = UploadFile {
            repo: &db,
            storage: &storage,
            max_bytes: 64,
        }
        .execute(owner, b"hello".to_vec(), Some("a.txt".into()), None)
        .await
        .unwrap();

        let read = ReadFileContent {
            repo: &db,
            storage: &storage,
        };
        let (_, bytes) = read.execute(&principal(owner, vec![]), file.id).await.unwrap();
        assert_eq!(bytes, b"hello");
        assert!(read.execute(&admin(Uuid::new_v4()), file.id).await.is_ok());

        let err = GetFile { repo: &db }
            .execute(&principal(Uuid::new_v4(), vec![]), file.id)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::FileNotFound);

        let listed = ListFiles { repo: &db }
            .execute(owner, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(listed.total, 1);
    }
}
