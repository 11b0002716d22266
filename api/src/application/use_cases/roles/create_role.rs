use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::permission_repository::PermissionRepository;
use crate::application::ports::role_repository::RoleRepository;
use crate::application::use_cases::roles::ensure_permissions_exist;
use crate::domain::access::role::Role;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 50, message = "must be 1-50 characters"))]
    pub name: String,
    #[validate(length(max = 255))]
    pub description: Option<String>,
    #[serde(default)]
    pub permission_ids: Vec<Uuid>,
}

pub struct CreateRole<'a, R, P>
where
    R: RoleRepository + ?Sized,
    P: PermissionRepository + ?Sized,
{
    pub roles: &'a R,
    pub permissions: &'a P,
}

impl<'a, R, P> CreateRole<'a, R, P>
where
    R: RoleRepository + ?Sized,
    P: PermissionRepository + ?Sized,
{
    pub async fn execute(&self, req: &CreateRoleRequest) -> AppResult<Role> {
        req.validate()?;
        let name = req.name.trim();
        if self.roles.find_by_name(name).await?.is_some() {
            return Err(AppError::code(ErrorCode::RoleNameTaken));
        }
        ensure_permissions_exist(self.permissions, &req.permission_ids).await?;
        let role = self
            .roles
            .create(name, req.description.as_deref(), false)
            .await?;
        self.roles
            .set_permissions(role.id, &req.permission_ids)
            .await?;
        self.roles
            .find_by_id(role.id)
            .await?
            .ok_or_else(|| AppError::code(ErrorCode::RoleNotFound))
    }
}
