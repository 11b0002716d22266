use uuid::Uuid;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::role_repository::RoleRepository;
use crate::domain::access::role::Role;

pub struct ListRoles<'a, R: RoleRepository + ?Sized> {
    pub roles: &'a R,
}

impl<'a, R: RoleRepository + ?Sized> ListRoles<'a, R> {
    pub async fn execute(&self) -> AppResult<Vec<Role>> {
        Ok(self.roles.list().await?)
    }
}

pub struct GetRole<'a, R: RoleRepository + ?Sized> {
    pub roles: &'a R,
}

impl<'a, R: RoleRepository + ?Sized> GetRole<'a, R> {
    pub async fn execute(&self, id: Uuid) -> AppResult<Role> {
        self.roles
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::code(ErrorCode::RoleNotFound))
    }
}
