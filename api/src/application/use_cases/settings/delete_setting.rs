use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::setting_repository::SettingRepository;

pub struct DeleteSetting<'a, R: SettingRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: SettingRepository + ?Sized> DeleteSetting<'a, R> {
    pub async fn execute(&self, key: &str) -> AppResult<()> {
        if !self.repo.delete(key).await? {
            return Err(AppError::code(ErrorCode::SettingNotFound));
        }
        Ok(())
    }
}
