use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::setting_repository::SettingRepository;
use crate::domain::settings::setting::Setting;

pub struct GetSetting<'a, R: SettingRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: SettingRepository + ?Sized> GetSetting<'a, R> {
    pub async fn execute(&self, key: &str) -> AppResult<Setting> {
        self.repo
            .get(key)
            .await?
            .ok_or_else(|| AppError::code(ErrorCode::SettingNotFound))
    }
}
