use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;

use crate::application::ports::setting_repository::{SettingInput, SettingRepository};
use crate::domain::settings::setting::Setting;
use crate::infrastructure::crypto::{decrypt_json, encrypt_json};
use crate::infrastructure::db::PgPool;

const SETTING_COLUMNS: &str = "key, value, description, is_public, is_secret, created_at, updated_at";

/// Settings table access. Values flagged `is_secret` are sealed with AES-GCM
/// before they reach the database.
pub struct SqlxSettingRepository {
    pub pool: PgPool,
    encryption_key: String,
}

impl SqlxSettingRepository {
    pub fn new(pool: PgPool, encryption_key: impl Into<String>) -> Self {
        Self {
            pool,
            encryption_key: encryption_key.into(),
        }
    }

    fn map_setting(&self, r: &PgRow) -> anyhow::Result<Setting> {
        let is_secret: bool = r.get("is_secret");
        let stored: serde_json::Value = r.get("value");
        let value = if is_secret {
            decrypt_json(&self.encryption_key, &stored)?
        } else {
            stored
        };
        Ok(Setting {
            key: r.get("key"),
            value,
            description: r.try_get("description").ok().flatten(),
            is_public: r.get("is_public"),
            is_secret,
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        })
    }
}

#[async_trait]
impl SettingRepository for SqlxSettingRepository {
    async fn list(&self, public_only: bool) -> anyhow::Result<Vec<Setting>> {
        let rows = sqlx::query(&format!(
            "SELECT {SETTING_COLUMNS} FROM settings WHERE ($1 = FALSE OR is_public) ORDER BY key"
        ))
        .bind(public_only)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(|r| self.map_setting(r)).collect()
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Setting>> {
        let row = sqlx::query(&format!("SELECT {SETTING_COLUMNS} FROM settings WHERE key = $1"))
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(|r| self.map_setting(r)).transpose()
    }

    async fn upsert(&self, input: SettingInput) -> anyhow::Result<Setting> {
        let stored = if input.is_secret {
            encrypt_json(&self.encryption_key, &input.value)?
        } else {
            input.value.clone()
        };
        let row = sqlx::query(&format!(
            r#"INSERT INTO settings (key, value, description, is_public, is_secret)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (key) DO UPDATE SET
                 value = EXCLUDED.value,
                 description = EXCLUDED.description,
                 is_public = EXCLUDED.is_public,
                 is_secret = EXCLUDED.is_secret,
                 updated_at = now()
               RETURNING {SETTING_COLUMNS}"#
        ))
        .bind(&input.key)
        .bind(&stored)
        .bind(input.description.as_deref())
        .bind(input.is_public)
        .bind(input.is_secret)
        .fetch_one(&self.pool)
        .await?;
        self.map_setting(&row)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM settings WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
