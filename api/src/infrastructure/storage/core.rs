use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const DEFAULT_FILENAME: &str = "file.bin";
const MAX_FILENAME_LEN: usize = 100;

pub fn sanitize_filename(name: &str) -> String {
    // browsers may send a full client path
    let base = name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or_default();
    let mut s = base.trim().to_string();
    let invalid = [':', '*', '?', '"', '<', '>', '|', '\0'];
    for ch in invalid {
        s = s.replace(ch, "-");
    }
    s = s.replace(' ', "_");
    let s = s.trim_start_matches('.').to_string();
    let mut s: String = s.chars().take(MAX_FILENAME_LEN).collect();
    if s.is_empty() {
        s = DEFAULT_FILENAME.into();
    }
    s
}

/// `<owner>/<yyyy>/<mm>/`
pub fn object_dir(owner_id: Uuid, at: DateTime<Utc>) -> String {
    format!("{}/{:04}/{:02}", owner_id, at.year(), at.month())
}

/// `photo.png` -> `photo-1.png` for `n == 1`.
pub fn with_suffix(name: &str, n: usize) -> String {
    let p = Path::new(name);
    let stem = p
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("file");
    match p.extension().and_then(|s| s.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{stem}-{n}.{ext}"),
        _ => format!("{stem}-{n}"),
    }
}

/// Rejects keys that would escape the storage root.
pub fn safe_relative(key: &str) -> anyhow::Result<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(key).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => continue,
            _ => anyhow::bail!("forbidden storage key: {key}"),
        }
    }
    if relative.as_os_str().is_empty() {
        anyhow::bail!("empty storage key");
    }
    Ok(relative)
}

pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
