use uuid::Uuid;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::permission_repository::PermissionRepository;

pub struct DeletePermission<'a, P: PermissionRepository + ?Sized> {
    pub permissions: &'a P,
}

impl<'a, P: PermissionRepository + ?Sized> DeletePermission<'a, P> {
    pub async fn execute(&self, id: Uuid) -> AppResult<()> {
        if !self.permissions.delete(id).await? {
            return Err(AppError::code(ErrorCode::PermissionNotFound));
        }
        Ok(())
    }
}
