use crate::application::errors::AppResult;
use crate::application::ports::setting_repository::SettingRepository;
use crate::domain::settings::setting::Setting;

pub struct ListSettings<'a, R: SettingRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: SettingRepository + ?Sized> ListSettings<'a, R> {
    /// Secret values are always masked in listings.
    pub async fn execute(&self, public_only: bool) -> AppResult<Vec<Setting>> {
        let settings = self.repo.list(public_only).await?;
        Ok(settings.into_iter().map(Setting::masked).collect())
    }
}
