use serde_json::json;
use tracing::info;

use super::{ObjectStorage, StorageError};

/// Policy granting anonymous `s3:GetObject` on every object in `bucket`.
pub fn public_read_policy(bucket: &str) -> String {
    json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Principal": {"AWS": "*"},
                "Action": ["s3:GetObject"],
                "Resource": [format!("arn:aws:s3:::{}/*", bucket)]
            }
        ]
    })
    .to_string()
}

/// Creates `bucket` when missing and (re)applies the public read policy.
pub async fn ensure_bucket(storage: &dyn ObjectStorage, bucket: &str) -> Result<(), StorageError> {
    if !storage.bucket_exists(bucket).await? {
        storage.make_bucket(bucket).await?;
        info!(bucket, "created bucket");
    }
    storage
        .set_bucket_policy(bucket, &public_read_policy(bucket))
        .await?;
    info!(bucket, "public read policy set");
    Ok(())
}
