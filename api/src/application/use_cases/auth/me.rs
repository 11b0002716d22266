use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::user_repository::UserRepository;
use crate::domain::users::user::User;

pub struct GetMe<'a, U: UserRepository + ?Sized> {
    pub users: &'a U,
}

impl<'a, U: UserRepository + ?Sized> GetMe<'a, U> {
    pub async fn execute(&self, user_id: Uuid) -> AppResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::code(ErrorCode::UserNotFound))
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateMeRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: Option<String>,
}

pub struct UpdateMe<'a, U: UserRepository + ?Sized> {
    pub users: &'a U,
}

impl<'a, U: UserRepository + ?Sized> UpdateMe<'a, U> {
    pub async fn execute(&self, user_id: Uuid, req: &UpdateMeRequest) -> AppResult<User> {
        req.validate()?;
        let name = req.name.as_deref().map(str::trim);
        self.users
            .update_profile(user_id, name, None)
            .await?
            .ok_or_else(|| AppError::code(ErrorCode::UserNotFound))
    }
}
