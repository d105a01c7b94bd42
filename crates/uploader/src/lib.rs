//! Uploader
//!
//! Transfers the packaged artifact to its destination. The primary target
//! is the master server's HTTP upload endpoint; an S3/MinIO target is
//! available for bucket-backed deployments. Transient upload failures are
//! retried a small bounded number of times with exponential backoff before
//! being surfaced, since a retry is cheap relative to the GPU time already
//! sunk into training.

mod http;
mod retry;
mod s3;

pub use http::HttpUploader;
pub use retry::{with_retries, RetryPolicy};
pub use s3::{S3UploadConfig, S3Uploader};

use std::path::Path;

use async_trait::async_trait;
use gsplat_common::Result;

/// Destination for packaged artifacts
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload the archive and return a stable retrieval URL
    async fn upload(&self, archive_path: &Path, scene_id: &str) -> Result<String>;
}
