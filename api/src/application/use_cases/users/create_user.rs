use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::role_repository::RoleRepository;
use crate::application::ports::user_repository::UserRepository;
use crate::application::services::passwords::hash_password;
use crate::application::use_cases::auth::normalize_email;
use crate::application::use_cases::users::ensure_roles_exist;
use crate::domain::users::user::User;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
    #[serde(default)]
    pub role_ids: Vec<Uuid>,
}

pub struct CreateUser<'a, U, R>
where
    U: UserRepository + ?Sized,
    R: RoleRepository + ?Sized,
{
    pub users: &'a U,
    pub roles: &'a R,
}

impl<'a, U, R> CreateUser<'a, U, R>
where
    U: UserRepository + ?Sized,
    R: RoleRepository + ?Sized,
{
    pub async fn execute(&self, req: &CreateUserRequest) -> AppResult<User> {
        // trim before validating so padded input is accepted
        let req = CreateUserRequest {
            email: normalize_email(&req.email),
            ..req.clone()
        };
        req.validate()?;
        let email = req.email.clone();
        if self.users.email_exists(&email).await? {
            return Err(AppError::code(ErrorCode::EmailTaken));
        }
        ensure_roles_exist(self.roles, &req.role_ids).await?;
        let hash = hash_password(&req.password)?;
        let user = self
            .users
            .create_user(&email, req.name.trim(), &hash)
            .await?;
        if !req.role_ids.is_empty() {
            self.users.set_roles(user.id, &req.role_ids).await?;
        }
        Ok(self.users.find_by_id(user.id).await?.unwrap_or(user))
    }
}
