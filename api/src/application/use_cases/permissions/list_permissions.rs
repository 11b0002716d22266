use crate::application::errors::AppResult;
use crate::application::ports::permission_repository::PermissionRepository;
use crate::domain::access::role::Permission;

pub struct ListPermissions<'a, P: PermissionRepository + ?Sized> {
    pub permissions: &'a P,
}

impl<'a, P: PermissionRepository + ?Sized> ListPermissions<'a, P> {
    pub async fn execute(&self) -> AppResult<Vec<Permission>> {
        Ok(self.permissions.list().await?)
    }
}
