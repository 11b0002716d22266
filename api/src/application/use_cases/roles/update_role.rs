use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::permission_repository::PermissionRepository;
use crate::application::ports::role_repository::RoleRepository;
use crate::application::use_cases::roles::ensure_permissions_exist;
use crate::domain::access::role::Role;

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, max = 50, message = "must be 1-50 characters"))]
    pub name: Option<String>,
    /// An empty string clears the description.
    #[validate(length(max = 255))]
    pub description: Option<String>,
    pub permission_ids: Option<Vec<Uuid>>,
}

pub struct UpdateRole<'a, R, P>
where
    R: RoleRepository + ?Sized,
    P: PermissionRepository + ?Sized,
{
    pub roles: &'a R,
    pub permissions: &'a P,
}

impl<'a, R, P> UpdateRole<'a, R, P>
where
    R: RoleRepository + ?Sized,
    P: PermissionRepository + ?Sized,
{
    pub async fn execute(&self, id: Uuid, req: &UpdateRoleRequest) -> AppResult<Role> {
        req.validate()?;
        let role = self
            .roles
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::code(ErrorCode::RoleNotFound))?;

        let name = req.name.as_deref().map(str::trim).filter(|n| *n != role.name);
        if let Some(name) = name {
            // seeded roles are looked up by name
            if role.is_system {
                return Err(AppError::with_message(
                    ErrorCode::RoleProtected,
                    "system roles cannot be renamed",
                ));
            }
            if self.roles.find_by_name(name).await?.is_some() {
                return Err(AppError::code(ErrorCode::RoleNameTaken));
            }
        }
        if let Some(ids) = &req.permission_ids {
            ensure_permissions_exist(self.permissions, ids).await?;
        }

        let description = req
            .description
            .as_deref()
            .map(|d| Some(d.trim()).filter(|d| !d.is_empty()));
        self.roles
            .update(id, name, description)
            .await?
            .ok_or_else(|| AppError::code(ErrorCode::RoleNotFound))?;
        if let Some(ids) = &req.permission_ids {
            self.roles.set_permissions(id, ids).await?;
        }
        self.roles
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::code(ErrorCode::RoleNotFound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::MemoryDb;

    fn uc(db: &MemoryDb) -> UpdateRole<'_, MemoryDb, MemoryDb> {
        UpdateRole {
            roles: db,
            permissions: db,
        }
    }

    #[tokio::test]
    async fn renames_and_clears_description() {
        let db = MemoryDb::default();
        let role = RoleRepository::create(&db, "support", Some("tier 1"), false)
            .await
            .unwrap();
        let updated = uc(&db)
            .execute(
                role.id,
                &UpdateRoleRequest {
                    name: Some("helpdesk".into()),
                    description: Some(String::new()),
                    permission_ids: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "helpdesk");
        assert_eq!(updated.description, None);
    }

    #[tokio::test]
    async fn name_collisions_and_system_roles() {
        let db = MemoryDb::default();
        RoleRepository::create(&db, "admin", None, true).await.unwrap();
        let user_role = RoleRepository::create(&db, "user", None, true).await.unwrap();
        let support = RoleRepository::create(&db, "support", None, false).await.unwrap();

        let rename = |name: &str| UpdateRoleRequest {
            name: Some(name.into()),
            ..Default::default()
        };
        let err = uc(&db).execute(support.id, &rename("admin")).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::RoleNameTaken);
        let err = uc(&db).execute(user_role.id, &rename("member")).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::RoleProtected);
        // same name is not a rename
        uc(&db).execute(user_role.id, &rename("user")).await.unwrap();
    }
}
