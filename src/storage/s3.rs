use async_trait::async_trait;
use aws_config::{retry::RetryConfig, BehaviorVersion};
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
    Client,
};
use std::path::Path;
use tracing::{debug, info};

use super::{ObjectStorage, ObjectStorageConfig, StorageError};

const DEFAULT_REGION: &str = "us-east-1";

fn request_error<E>(operation: &'static str, target: &str, err: E) -> StorageError
where
    E: std::error::Error,
{
    StorageError::Request {
        operation,
        target: target.to_string(),
        message: DisplayErrorContext(&err).to_string(),
    }
}

/// S3 compatible object storage (AWS, MinIO, ...), addressed path-style.
#[derive(Debug, Clone)]
pub struct S3ObjectStorage {
    client: Client,
    region: String,
}

impl S3ObjectStorage {
    pub async fn new(config: &ObjectStorageConfig) -> Self {
        let endpoint = config.endpoint_url();
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "tts-service",
        );
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&endpoint)
            .credentials_provider(credentials)
            // A failed upload falls back to local disk, so one attempt only.
            .retry_config(RetryConfig::disabled())
            .load()
            .await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        info!(endpoint = %endpoint, region = %config.region, "object storage client configured");
        Self {
            client: Client::from_conf(s3_config),
            region: config.region.clone(),
        }
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false)
                {
                    Ok(false)
                } else {
                    Err(request_error("head_bucket", bucket, err))
                }
            }
        }
    }

    async fn make_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }
        match request.send().await {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_bucket_already_owned_by_you())
                    .unwrap_or(false) =>
            {
                debug!(bucket, "bucket already owned by us");
                Ok(())
            }
            Err(err) => Err(request_error("create_bucket", bucket, err)),
        }
    }

    async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), StorageError> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await
            .map_err(|err| request_error("put_bucket_policy", bucket, err))?;
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|err| StorageError::Body {
                path: local_path.to_path_buf(),
                message: err.to_string(),
            })?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|err| request_error("put_object", &format!("{}/{}", bucket, key), err))?;
        debug!(bucket, key, "object uploaded");
        Ok(())
    }
}
