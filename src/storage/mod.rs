use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

mod bucket;
mod local;
mod s3;
pub use bucket::{ensure_bucket, public_read_policy};
pub use local::{LocalAudio, LocalAudioStore};
pub use s3::S3ObjectStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{operation} {target} failed: {message}")]
    Request {
        operation: &'static str,
        target: String,
        message: String,
    },
    #[error("read {}: {message}", path.display())]
    Body { path: PathBuf, message: String },
}

/// Key/value blob store with bucket-level access policy.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError>;
    async fn make_bucket(&self, bucket: &str) -> Result<(), StorageError>;
    async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), StorageError>;
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
        content_type: &str,
    ) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStorageConfig {
    /// Host name, or a full URL such as `http://minio:9000`.
    pub endpoint: String,
    pub port: u16,
    pub use_ssl: bool,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub bucket: String,
    /// Base of the URLs handed out to clients, when it differs from `endpoint`.
    pub public_url: Option<String>,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "localhost".to_string(),
            port: 9000,
            use_ssl: false,
            access_key: "admin".to_string(),
            secret_key: "password123".to_string(),
            region: "us-east-1".to_string(),
            bucket: "video-gen-audio".to_string(),
            public_url: None,
        }
    }
}

impl ObjectStorageConfig {
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.contains("://") {
            return self.endpoint.trim_end_matches('/').to_string();
        }
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.endpoint, self.port)
    }

    pub fn public_base_url(&self) -> String {
        self.public_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| self.endpoint_url())
    }
}

pub fn object_url(base_url: &str, bucket: &str, key: &str) -> String {
    format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        bucket,
        key.trim_start_matches('/')
    )
}
