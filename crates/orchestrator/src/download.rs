use std::path::Path;

use gsplat_common::{JobError, Result};
use tokio::io::AsyncWriteExt;
use tracing::info;

fn input_error(e: impl std::fmt::Display) -> JobError {
    JobError::Input(e.to_string())
}

/// Fetch the source video to `dest`
///
/// Supports `http`/`https` URLs, and `file://` paths for videos already
/// staged on the local filesystem. Anything unreachable, empty, or with an
/// unsupported scheme is an `Input` failure; a missing video is never worth
/// retrying downstream stages for.
pub async fn download_video(client: &reqwest::Client, url: &str, dest: &Path) -> Result<u64> {
    if let Some(path) = url.strip_prefix("file://") {
        let bytes = tokio::fs::copy(path, dest)
            .await
            .map_err(|e| input_error(format!("unreadable local video {path}: {e}")))?;
        if bytes == 0 {
            return Err(JobError::Input(format!("local video is empty: {path}")));
        }
        info!("Staged {} bytes from {}", bytes, path);
        return Ok(bytes);
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(JobError::Input(format!("unsupported video URL: {url}")));
    }

    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(input_error)?
        .error_for_status()
        .map_err(input_error)?;

    let mut file = tokio::fs::File::create(dest).await?;
    let mut bytes: u64 = 0;
    while let Some(chunk) = response.chunk().await.map_err(input_error)? {
        file.write_all(&chunk).await?;
        bytes += chunk.len() as u64;
    }
    file.flush().await?;

    if bytes == 0 {
        return Err(JobError::Input(format!("downloaded video is empty: {url}")));
    }
    info!("Downloaded {} bytes from {}", bytes, url);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_url_copies_local_video() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.mp4");
        tokio::fs::write(&source, b"video bytes").await.unwrap();

        let dest = dir.path().join("staged.mp4");
        let url = format!("file://{}", source.display());
        let bytes = download_video(&reqwest::Client::new(), &url, &dest)
            .await
            .unwrap();
        assert_eq!(bytes, 11);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"video bytes");
    }

    #[tokio::test]
    async fn test_missing_local_video_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = download_video(
            &reqwest::Client::new(),
            "file:///nonexistent/clip.mp4",
            &dir.path().join("staged.mp4"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "input");
    }

    #[tokio::test]
    async fn test_empty_local_video_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("empty.mp4");
        tokio::fs::write(&source, b"").await.unwrap();

        let err = download_video(
            &reqwest::Client::new(),
            &format!("file://{}", source.display()),
            &dir.path().join("staged.mp4"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "input");
        assert!(err.to_string().contains("empty"));
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = download_video(
            &reqwest::Client::new(),
            "ftp://server/clip.mp4",
            &dir.path().join("staged.mp4"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "input");
        assert!(err.to_string().contains("unsupported"));
    }
}
