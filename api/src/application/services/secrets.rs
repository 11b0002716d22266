use base64::Engine as _;
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::auth::api_key::API_KEY_MARKER;

/// URL-safe random string carrying `bytes` bytes of entropy.
pub fn random_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

pub fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn generate_api_key() -> String {
    format!("{}{}", API_KEY_MARKER, random_token(32))
}

/// Refresh tokens are `<session id>.<secret>`; only the secret's hash is stored.
pub fn compose_refresh_token(session_id: Uuid, secret: &str) -> String {
    format!("{}.{}", session_id, secret)
}

pub fn split_refresh_token(token: &str) -> Option<(Uuid, &str)> {
    let (sid, secret) = token.trim().split_once('.')?;
    if secret.is_empty() {
        return None;
    }
    Uuid::parse_str(sid).ok().map(|id| (id, secret))
}

/// Comparison whose duration does not depend on where the inputs differ.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_url_safe_and_unique() {
        let a = random_token(32);
        let b = random_token(32);
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn api_keys_carry_marker() {
        assert!(generate_api_key().starts_with("ak_"));
    }

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn refresh_token_split() {
        let sid = Uuid::new_v4();
        let token = compose_refresh_token(sid, "s3cret");
        assert_eq!(split_refresh_token(&token), Some((sid, "s3cret")));
        assert_eq!(split_refresh_token("garbage"), None);
        assert_eq!(split_refresh_token(&format!("{sid}.")), None);
        assert_eq!(split_refresh_token("not-a-uuid.secret"), None);
    }

    #[test]
    fn constant_time_eq_behaves_like_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }
}
