use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::application::errors::{AppError, AppResult};
use crate::application::ports::setting_repository::{SettingInput, SettingRepository};
use crate::domain::settings::setting::{Setting, is_valid_key};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpsertSettingRequest {
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
    #[validate(length(max = 255))]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_secret: bool,
}

pub struct UpsertSetting<'a, R: SettingRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: SettingRepository + ?Sized> UpsertSetting<'a, R> {
    pub async fn execute(&self, key: &str, req: &UpsertSettingRequest) -> AppResult<Setting> {
        req.validate()?;
        if !is_valid_key(key) {
            return Err(AppError::validation(
                "key: must match ^[a-z0-9_.-]{1,100}$",
            ));
        }
        if req.is_public && req.is_secret {
            return Err(AppError::validation(
                "is_public: secret settings cannot be public",
            ));
        }
        let setting = self
            .repo
            .upsert(SettingInput {
                key: key.to_string(),
                value: req.value.clone(),
                description: req.description.clone(),
                is_public: req.is_public,
                is_secret: req.is_secret,
            })
            .await?;
        tracing::info!(key = %setting.key, secret = setting.is_secret, "setting_upserted");
        Ok(setting.masked())
    }
}
