pub mod create_role;
pub mod delete_role;
pub mod get_role;
pub mod update_role;

use uuid::Uuid;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::permission_repository::PermissionRepository;

pub(crate) async fn ensure_permissions_exist<P>(permissions: &P, ids: &[Uuid]) -> AppResult<()>
where
    P: PermissionRepository + ?Sized,
{
    if ids.is_empty() {
        return Ok(());
    }
    let found = permissions.existing_ids(ids).await?;
    match ids.iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(AppError::with_message(
            ErrorCode::PermissionNotFound,
            format!("permission {missing} not found"),
        )),
        None => Ok(()),
    }
}
