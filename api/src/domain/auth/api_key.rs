use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Every issued key starts with this marker so leaked keys are easy to grep for.
pub const API_KEY_MARKER: &str = "ak_";
/// Number of leading characters kept in clear for display.
pub const API_KEY_PREFIX_LEN: usize = 11;

#[derive(Debug, Clone)]
pub struct ApiKey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub prefix: String,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyRejection {
    Revoked,
    Inactive,
    Expired,
}

impl ApiKey {
    pub fn check_usable(&self, now: DateTime<Utc>) -> Result<(), ApiKeyRejection> {
        if self.deleted_at.is_some() {
            return Err(ApiKeyRejection::Revoked);
        }
        if !self.is_active {
            return Err(ApiKeyRejection::Inactive);
        }
        match self.expires_at {
            Some(exp) if exp <= now => Err(ApiKeyRejection::Expired),
            _ => Ok(()),
        }
    }
}

pub fn display_prefix(plaintext: &str) -> String {
    plaintext.chars().take(API_KEY_PREFIX_LEN).collect()
}
