//! S3/MinIO upload target
//!
//! Alternative to the HTTP master-server endpoint for bucket-backed
//! deployments. Archives are stored under `{key_prefix}{scene_id}.zip`.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};
use gsplat_common::{JobError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::retry::{with_retries, RetryPolicy};
use crate::Uploader;

/// S3/MinIO configuration
///
/// Credentials are explicit; the caller collects them, nothing here reads
/// the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3UploadConfig {
    /// Bucket name
    pub bucket: String,

    /// AWS region, or "us-east-1" for `MinIO`
    pub region: String,

    /// Custom endpoint for `MinIO`, `None` for AWS S3
    pub endpoint: Option<String>,

    pub access_key_id: String,
    pub secret_access_key: String,

    /// Key prefix for all archives (e.g. "gsplatt/")
    pub key_prefix: String,
}

/// Uploads archives to an S3-compatible bucket
pub struct S3Uploader {
    client: Client,
    bucket: String,
    key_prefix: String,
    endpoint: Option<String>,
    retry: RetryPolicy,
}

impl S3Uploader {
    pub fn new(config: S3UploadConfig, retry: RetryPolicy) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "gsplat-uploader",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .behavior_version_latest();

        if let Some(endpoint) = &config.endpoint {
            // Path-style addressing is required for MinIO.
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket,
            key_prefix: config.key_prefix,
            endpoint: config.endpoint,
            retry,
        }
    }

    fn object_key(&self, scene_id: &str) -> String {
        format!("{}{}.zip", self.key_prefix, scene_id)
    }

    fn public_url(&self, key: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => {
                format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
            }
            None => format!("https://{}.s3.amazonaws.com/{}", self.bucket, key),
        }
    }

    async fn try_put(&self, key: &str, archive_path: &Path) -> std::result::Result<(), String> {
        let body = ByteStream::from_path(archive_path)
            .await
            .map_err(|e| format!("unreadable archive: {e}"))?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/zip")
            .body(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[async_trait]
impl Uploader for S3Uploader {
    async fn upload(&self, archive_path: &Path, scene_id: &str) -> Result<String> {
        let key = self.object_key(scene_id);
        with_retries(self.retry, |_| self.try_put(&key, archive_path))
            .await
            .map_err(|(reason, attempts)| JobError::Upload { reason, attempts })?;
        let url = self.public_url(&key);
        info!("Stored {} at s3://{}/{}", scene_id, self.bucket, key);
        Ok(url)
    }
}
