use uuid::Uuid;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::role_repository::RoleRepository;

pub struct DeleteRole<'a, R: RoleRepository + ?Sized> {
    pub roles: &'a R,
}

impl<'a, R: RoleRepository + ?Sized> DeleteRole<'a, R> {
    pub async fn execute(&self, id: Uuid) -> AppResult<()> {
        let role = self
            .roles
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::code(ErrorCode::RoleNotFound))?;
        if role.is_system {
            return Err(AppError::code(ErrorCode::RoleProtected));
        }
        if !self.roles.soft_delete(id).await? {
            return Err(AppError::code(ErrorCode::RoleNotFound));
        }
        Ok(())
    }
}
