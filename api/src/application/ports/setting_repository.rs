use async_trait::async_trait;

use crate::domain::settings::setting::Setting;

#[derive(Debug, Clone)]
pub struct SettingInput {
    pub key: String,
    pub value: serde_json::Value,
    pub description: Option<String>,
    pub is_public: bool,
    pub is_secret: bool,
}

/// Secret values are stored encrypted; implementations hand back plaintext.
#[async_trait]
pub trait SettingRepository: Send + Sync {
    async fn list(&self, public_only: bool) -> anyhow::Result<Vec<Setting>>;
    async fn get(&self, key: &str) -> anyhow::Result<Option<Setting>>;
    async fn upsert(&self, input: SettingInput) -> anyhow::Result<Setting>;
    async fn delete(&self, key: &str) -> anyhow::Result<bool>;
}
