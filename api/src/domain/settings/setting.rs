use once_cell::sync::Lazy;
use regex::Regex;

static SETTING_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_.-]{1,100}$").expect("valid regex"));

pub const MASKED_VALUE: &str = "********";

#[derive(Debug, Clone)]
pub struct Setting {
    pub key: String,
    pub value: serde_json::Value,
    pub description: Option<String>,
    pub is_public: bool,
    pub is_secret: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Setting {
    pub fn masked(mut self) -> Self {
        if self.is_secret {
            self.value = serde_json::Value::String(MASKED_VALUE.to_string());
        }
        self
    }
}

pub fn is_valid_key(key: &str) -> bool {
    SETTING_KEY_RE.is_match(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_format() {
        assert!(is_valid_key("mail.from_address"));
        assert!(is_valid_key("feature-x"));
        assert!(!is_valid_key("Mail.From"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("has space"));
        assert!(!is_valid_key(&"a".repeat(101)));
    }

    #[test]
    fn masking_only_touches_secrets() {
        let now = chrono::Utc::now();
        let s = Setting {
            key: "smtp.password".into(),
            value: serde_json::json!("hunter2"),
            description: None,
            is_public: false,
            is_secret: true,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(s.clone().masked().value, serde_json::json!(MASKED_VALUE));
        let plain = Setting {
            is_secret: false,
            ..s
        };
        assert_eq!(plain.masked().value, serde_json::json!("hunter2"));
    }
}
