use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use gsplat_common::{JobError, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::info;

use crate::retry::{with_retries, RetryPolicy};
use crate::Uploader;

/// Uploads archives to the master server over HTTP(S)
///
/// `POST {base_url}/upload/{scene_id}` with the archive as a multipart body
/// and a bearer token when an API key is configured. The retrieval URL is
/// taken from the server's JSON response when present, otherwise
/// constructed from the well-known files path.
pub struct HttpUploader {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

/// Endpoint the archive is posted to
fn upload_endpoint(base_url: &str, scene_id: &str) -> String {
    format!("{}/upload/{}", base_url.trim_end_matches('/'), scene_id)
}

/// Retrieval URL used when the server response does not carry one
fn fallback_url(base_url: &str, scene_id: &str) -> String {
    format!(
        "{}/files/gsplatt/{}.zip",
        base_url.trim_end_matches('/'),
        scene_id
    )
}

impl HttpUploader {
    /// Create an uploader for `base_url`
    ///
    /// # Errors
    /// `JobError::Input` when the HTTP client cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| JobError::Input(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
            retry,
        })
    }

    /// One upload attempt; errors are strings so the retry loop can log them
    async fn try_upload(
        &self,
        archive_path: &Path,
        scene_id: &str,
    ) -> std::result::Result<String, String> {
        let bytes = tokio::fs::read(archive_path)
            .await
            .map_err(|e| format!("unreadable archive: {e}"))?;

        let part = Part::bytes(bytes)
            .file_name(format!("{scene_id}.zip"))
            .mime_str("application/zip")
            .map_err(|e| e.to_string())?;
        let form = Form::new().part("archive", part);

        let mut request = self
            .client
            .post(upload_endpoint(&self.base_url, scene_id))
            .multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("server returned {status}"));
        }

        let url = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.get("url").and_then(|u| u.as_str()).map(str::to_string))
            .unwrap_or_else(|| fallback_url(&self.base_url, scene_id));
        Ok(url)
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, archive_path: &Path, scene_id: &str) -> Result<String> {
        let url = with_retries(self.retry, |_| self.try_upload(archive_path, scene_id))
            .await
            .map_err(|(reason, attempts)| JobError::Upload { reason, attempts })?;
        info!("Uploaded {} to {}", scene_id, url);
        Ok(url)
    }
}
