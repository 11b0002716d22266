pub mod create_user;
pub mod delete_user;
pub mod get_user;
pub mod list_users;
pub mod update_user;

use uuid::Uuid;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::role_repository::RoleRepository;

/// Fails with `ROLE_NOT_FOUND` naming the first unknown id.
pub(crate) async fn ensure_roles_exist<R>(roles: &R, ids: &[Uuid]) -> AppResult<()>
where
    R: RoleRepository + ?Sized,
{
    if ids.is_empty() {
        return Ok(());
    }
    let found = roles.existing_ids(ids).await?;
    match ids.iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(AppError::with_message(
            ErrorCode::RoleNotFound,
            format!("role {missing} not found"),
        )),
        None => Ok(()),
    }
}
