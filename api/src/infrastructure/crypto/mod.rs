use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use sha2::{Digest, Sha256};

const FORMAT_TAG: &str = "v1";

fn derive_key(secret: &str) -> Key<Aes256Gcm> {
    let digest = Sha256::digest(secret.as_bytes());
    *Key::<Aes256Gcm>::from_slice(&digest)
}

/// AES-256-GCM with a random nonce, encoded as `v1:<nonce b64>:<ciphertext b64>`.
pub fn encrypt_string(secret: &str, plaintext: &str) -> anyhow::Result<String> {
    let cipher = Aes256Gcm::new(&derive_key(secret));
    let mut nonce_bytes = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let ct = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
        .map_err(|e| anyhow::anyhow!("encrypt failed: {}", e))?;
    Ok(format!(
        "{}:{}:{}",
        FORMAT_TAG,
        STANDARD.encode(nonce_bytes),
        STANDARD.encode(ct)
    ))
}

pub fn decrypt_string(secret: &str, ciphertext: &str) -> anyhow::Result<String> {
    let mut parts = ciphertext.splitn(3, ':');
    let (Some(FORMAT_TAG), Some(n_b64), Some(c_b64)) = (parts.next(), parts.next(), parts.next())
    else {
        anyhow::bail!("invalid ciphertext format");
    };
    let nonce_bytes = STANDARD
        .decode(n_b64)
        .map_err(|e| anyhow::anyhow!("b64 decode nonce: {}", e))?;
    anyhow::ensure!(nonce_bytes.len() == 12, "invalid nonce length");
    let ct_bytes = STANDARD
        .decode(c_b64)
        .map_err(|e| anyhow::anyhow!("b64 decode ct: {}", e))?;
    let cipher = Aes256Gcm::new(&derive_key(secret));
    let pt = cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ct_bytes.as_ref())
        .map_err(|e| anyhow::anyhow!("decrypt failed: {}", e))?;
    Ok(String::from_utf8(pt)?)
}

pub fn is_encrypted(value: &str) -> bool {
    value.starts_with("v1:")
}

/// Serializes a JSON value and wraps the ciphertext in a JSON string.
pub fn encrypt_json(secret: &str, value: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
    let raw = serde_json::to_string(value)?;
    Ok(serde_json::Value::String(encrypt_string(secret, &raw)?))
}

/// Inverse of [`encrypt_json`]. Values that were never encrypted pass through.
pub fn decrypt_json(secret: &str, value: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
    match value {
        serde_json::Value::String(s) if is_encrypted(s) => {
            let raw = decrypt_string(secret, s)?;
            Ok(serde_json::from_str(&raw)?)
        }
        other => Ok(other.clone()),
    }
}
