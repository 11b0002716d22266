use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, error::SdkError};
use tokio::io::AsyncReadExt;
use uuid::Uuid;

use crate::application::ports::storage_port::{PresignedUpload, StoragePort, StoredObject};
use crate::bootstrap::config::Config;
use crate::infrastructure::storage::{
    DEFAULT_FILENAME, content_hash, object_dir, safe_relative, sanitize_filename, with_suffix,
};

pub struct S3StoragePort {
    client: Client,
    bucket: String,
    root_prefix: String,
}

impl S3StoragePort {
    pub async fn new(cfg: &Config) -> anyhow::Result<Self> {
        let bucket = cfg
            .s3_bucket
            .clone()
            .context("S3 bucket must be configured when using S3 storage backend")?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &cfg.s3_region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if let (Some(access), Some(secret)) = (&cfg.s3_access_key, &cfg.s3_secret_key) {
            let creds = Credentials::new(
                access.clone(),
                secret.clone(),
                None,
                None,
                "tenant-api-s3-static",
            );
            builder = builder.credentials_provider(creds);
        }
        if let Some(endpoint) = &cfg.s3_endpoint {
            builder = builder.endpoint_url(endpoint.clone());
        }
        if cfg.s3_use_path_style {
            builder = builder.force_path_style(true);
        }

        let client = Client::from_conf(builder.build());
        ensure_bucket(&client, &bucket).await?;

        Ok(Self {
            client,
            bucket,
            root_prefix: normalize_prefix(&cfg.storage_root),
        })
    }

    fn object_key(&self, key: &str) -> anyhow::Result<String> {
        let rel = safe_relative(key)?.to_string_lossy().replace('\\', "/");
        if self.root_prefix.is_empty() {
            Ok(rel)
        } else {
            Ok(format!("{}/{}", self.root_prefix, rel))
        }
    }

    async fn object_exists(&self, key: &str) -> anyhow::Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(service_err)) => {
                let head_err: &HeadObjectError = service_err.err();
                if head_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(anyhow!("head_object error for {}: {}", key, head_err))
                }
            }
            Err(other) => Err(anyhow!("head_object failed for {}: {}", key, other)),
        }
    }

    /// Picks a key under the owner's month directory that is not taken yet.
    async fn free_key(&self, owner_id: Uuid, filename: &str) -> anyhow::Result<(String, String)> {
        let dir = object_dir(owner_id, chrono::Utc::now());
        let safe = sanitize_filename(filename);
        let mut name = safe.clone();
        let mut counter = 1;
        loop {
            let key = format!("{dir}/{name}");
            if !self.object_exists(&self.object_key(&key)?).await? {
                return Ok((key, name));
            }
            name = with_suffix(&safe, counter);
            counter += 1;
        }
    }
}

fn key_taken<E>(err: &SdkError<E, HttpResponse>) -> bool {
    matches!(
        err.raw_response().map(|r| r.status().as_u16()),
        Some(409 | 412)
    )
}

fn normalize_prefix(root: &str) -> String {
    root.split(|c| c == '/' || c == '\\')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl StoragePort for S3StoragePort {
    async fn put(
        &self,
        owner_id: Uuid,
        original_filename: Option<&str>,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> anyhow::Result<StoredObject> {
        let dir = object_dir(owner_id, chrono::Utc::now());
        let safe = sanitize_filename(original_filename.unwrap_or(DEFAULT_FILENAME));
        let mut filename = safe.clone();
        let mut counter = 1;
        loop {
            let key = format!("{dir}/{filename}");
            let object_key = self.object_key(&key)?;
            // conditional write: a concurrent upload of the same name gets 412
            let mut req = self
                .client
                .put_object()
                .bucket(&self.bucket)
                .key(&object_key)
                .if_none_match("*")
                .body(ByteStream::from(bytes.to_vec()));
            if let Some(ct) = content_type {
                req = req.content_type(ct);
            }
            match req.send().await {
                Ok(_) => {
                    return Ok(StoredObject {
                        key,
                        filename,
                        size: bytes.len() as i64,
                        content_hash: content_hash(bytes),
                    });
                }
                Err(err) if key_taken(&err) => {
                    filename = with_suffix(&safe, counter);
                    counter += 1;
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("failed to upload object {object_key}"));
                }
            }
        }
    }

    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        let object_key = self.object_key(key)?;
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
            .with_context(|| format!("failed to get object {object_key}"))?;
        let mut reader = object.body.into_async_read();
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        Ok(data)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let object_key = self.object_key(key)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
            .with_context(|| format!("failed to delete object {object_key}"))?;
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> anyhow::Result<Option<String>> {
        let object_key = self.object_key(key)?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .presigned(PresigningConfig::expires_in(ttl)?)
            .await
            .with_context(|| format!("failed to presign get {object_key}"))?;
        Ok(Some(presigned.uri().to_string()))
    }

    async fn presign_put(
        &self,
        owner_id: Uuid,
        filename: &str,
        content_type: Option<&str>,
        ttl: Duration,
    ) -> anyhow::Result<Option<PresignedUpload>> {
        let (key, _) = self.free_key(owner_id, filename).await?;
        let object_key = self.object_key(&key)?;
        let mut req = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key);
        if let Some(ct) = content_type {
            req = req.content_type(ct);
        }
        let presigned = req
            .presigned(PresigningConfig::expires_in(ttl)?)
            .await
            .with_context(|| format!("failed to presign put {object_key}"))?;
        Ok(Some(PresignedUpload {
            key,
            url: presigned.uri().to_string(),
            method: presigned.method().to_string(),
        }))
    }
}

async fn ensure_bucket(client: &Client, bucket: &str) -> anyhow::Result<()> {
    match client.head_bucket().bucket(bucket).send().await {
        Ok(_) => return Ok(()),
        Err(SdkError::ServiceError(service_err)) => {
            if !matches!(service_err.err(), HeadBucketError::NotFound(_)) {
                return Err(anyhow!(service_err.err().to_string()));
            }
        }
        Err(err) => return Err(anyhow!(err.to_string())),
    }

    match client.create_bucket().bucket(bucket).send().await {
        Ok(_) => {
            tracing::info!(bucket, "s3_bucket_created");
            Ok(())
        }
        Err(SdkError::ServiceError(service_err)) => match service_err.err() {
            CreateBucketError::BucketAlreadyOwnedByYou(_) => Ok(()),
            CreateBucketError::BucketAlreadyExists(_) => Ok(()),
            other => Err(anyhow!(other.to_string())),
        },
        Err(err) => Err(anyhow!(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_prefix;

    #[test]
    fn prefix_drops_dots_and_slashes() {
        assert_eq!(normalize_prefix("./uploads/"), "uploads");
        assert_eq!(normalize_prefix("/data//files"), "data/files");
        assert_eq!(normalize_prefix("."), "");
    }
}
