use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::application::ports::storage_port::{PresignedUpload, StoragePort, StoredObject};
use crate::infrastructure::storage::{
    DEFAULT_FILENAME, content_hash, object_dir, safe_relative, sanitize_filename, with_suffix,
};

pub struct FsStoragePort {
    pub root: PathBuf,
}

impl FsStoragePort {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn absolute(&self, key: &str) -> anyhow::Result<PathBuf> {
        Ok(self.root.join(safe_relative(key)?))
    }
}

#[async_trait]
impl StoragePort for FsStoragePort {
    async fn put(
        &self,
        owner_id: Uuid,
        original_filename: Option<&str>,
        _content_type: Option<&str>,
        bytes: &[u8],
    ) -> anyhow::Result<StoredObject> {
        let dir = object_dir(owner_id, chrono::Utc::now());
        let abs_dir = self.absolute(&dir)?;
        tokio::fs::create_dir_all(&abs_dir)
            .await
            .with_context(|| format!("failed to create {}", abs_dir.display()))?;

        let safe = sanitize_filename(original_filename.unwrap_or(DEFAULT_FILENAME));
        let mut filename = safe.clone();
        let mut counter = 1;
        // create_new claims the name atomically, so concurrent uploads never share a key
        let mut file = loop {
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(abs_dir.join(&filename))
                .await
            {
                Ok(file) => break file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    filename = with_suffix(&safe, counter);
                    counter += 1;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("failed to create {dir}/{filename}"));
                }
            }
        };

        let key = format!("{dir}/{filename}");
        let written = async {
            file.write_all(bytes).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = written {
            drop(file);
            let _ = tokio::fs::remove_file(abs_dir.join(&filename)).await;
            return Err(e).with_context(|| format!("failed to write {key}"));
        }
        Ok(StoredObject {
            key,
            filename,
            size: bytes.len() as i64,
            content_hash: content_hash(bytes),
        })
    }

    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        let path = self.absolute(key)?;
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {key}"))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let path = self.absolute(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to delete {key}")),
        }
    }

    async fn presign_get(&self, _key: &str, _ttl: Duration) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    async fn presign_put(
        &self,
        _owner_id: Uuid,
        _filename: &str,
        _content_type: Option<&str>,
        _ttl: Duration,
    ) -> anyhow::Result<Option<PresignedUpload>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn put_get_delete_round() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStoragePort::new(dir.path());
        let owner = Uuid::new_v4();

        let first = storage
            .put(owner, Some("notes.txt"), Some("text/plain"), b"hello")
            .await
            .unwrap();
        assert!(first.key.starts_with(&owner.to_string()));
        assert!(first.key.ends_with("/notes.txt"));
        assert_eq!(first.size, 5);
        assert_eq!(storage.get(&first.key).await.unwrap(), b"hello");

        let second = storage
            .put(owner, Some("notes.txt"), None, b"again")
            .await
            .unwrap();
        assert_eq!(second.filename, "notes-1.txt");

        storage.delete(&first.key).await.unwrap();
        assert!(storage.get(&first.key).await.is_err());
        // deleting twice is fine
        storage.delete(&first.key).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_uploads_get_distinct_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FsStoragePort::new(dir.path()));
        let owner = Uuid::new_v4();

        let mut tasks = Vec::new();
        for i in 0..32u8 {
            let storage = storage.clone();
            tasks.push(tokio::spawn(async move {
                storage
                    .put(owner, Some("report.pdf"), None, &[i])
                    .await
                    .unwrap()
            }));
        }
        let mut keys = HashSet::new();
        for (i, task) in tasks.into_iter().enumerate() {
            let stored = task.await.unwrap();
            assert_eq!(storage.get(&stored.key).await.unwrap(), vec![i as u8]);
            keys.insert(stored.key);
        }
        assert_eq!(keys.len(), 32);
    }

    #[tokio::test]
    async fn refuses_keys_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStoragePort::new(dir.path());
        assert!(storage.get("../outside").await.is_err());
        assert!(storage.delete("/etc/hosts").await.is_err());
    }

    #[tokio::test]
    async fn presign_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStoragePort::new(dir.path());
        let ttl = Duration::from_secs(60);
        assert!(storage.presign_get("a/b", ttl).await.unwrap().is_none());
        assert!(
            storage
                .presign_put(Uuid::new_v4(), "a.txt", None, ttl)
                .await
                .unwrap()
                .is_none()
        );
    }
}
