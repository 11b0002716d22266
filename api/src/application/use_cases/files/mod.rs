pub mod delete_file;
pub mod get_file;
pub mod presign;
pub mod upload_file;

use uuid::Uuid;

use crate::application::access::Principal;
use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::files_repository::FilesRepository;
use crate::domain::access::ability::{Action, Subject};
use crate::domain::files::stored_file::StoredFile;

/// Loads a file the principal may act on. Other tenants' files read as missing.
pub(crate) async fn visible_file<R>(
    repo: &R,
    principal: &Principal,
    id: Uuid,
    action: Action,
) -> AppResult<StoredFile>
where
    R: FilesRepository + ?Sized,
{
    let file = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::code(ErrorCode::FileNotFound))?;
    if principal
        .require_owner_or(file.owner_id, action, Subject::File)
        .is_err()
    {
        return Err(AppError::code(ErrorCode::FileNotFound));
    }
    Ok(file)
}
