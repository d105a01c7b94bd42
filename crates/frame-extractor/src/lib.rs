//! Frame extractor
//!
//! Samples a video into an ordered sequence of JPEG frames on disk by
//! invoking ffmpeg through the tool runner. The zero-padded frame numbering
//! (`frame_00001.jpg`, ...) keeps lexicographic order equal to chronological
//! order, which the reconstruction stage relies on.

use std::path::{Path, PathBuf};

use gsplat_common::{JobError, Result};
use gsplat_tool_runner::{ToolCommand, ToolRunner};
use tracing::info;

/// Minimum frames for a usable reconstruction; COLMAP needs at least a
/// handful of overlapping views.
pub const MIN_FRAMES: usize = 3;

/// Extract frames from `video_path` into `output_dir` at `fps` frames per
/// second of source time.
///
/// Returns the extracted frame paths in chronological order.
///
/// # Errors
/// `JobError::Input` when the video is missing, empty, or unreadable, when
/// the sampling rate is not positive, or when fewer than [`MIN_FRAMES`]
/// frames come out.
pub async fn extract_frames(
    runner: &dyn ToolRunner,
    video_path: &Path,
    output_dir: &Path,
    fps: f64,
) -> Result<Vec<PathBuf>> {
    if !(fps > 0.0 && fps.is_finite()) {
        return Err(JobError::Input(format!(
            "frame sampling rate must be positive, got {fps}"
        )));
    }

    let metadata = tokio::fs::metadata(video_path)
        .await
        .map_err(|e| JobError::Input(format!("unreadable video {}: {e}", video_path.display())))?;
    if metadata.len() == 0 {
        return Err(JobError::Input(format!(
            "video file is empty: {}",
            video_path.display()
        )));
    }

    tokio::fs::create_dir_all(output_dir).await?;

    let pattern = output_dir.join("frame_%05d.jpg");
    let command = ToolCommand::new("ffmpeg")
        .arg("-y")
        .args(["-i".to_string(), video_path.display().to_string()])
        .args(["-vf".to_string(), format!("fps={fps}")])
        .args(["-q:v", "2"])
        .arg(pattern.display().to_string());

    runner
        .run(command)
        .await
        .map_err(|e| JobError::Input(format!("frame extraction failed: {e}")))?;

    let frames = list_frames(output_dir).await?;
    info!("Extracted {} frames to {}", frames.len(), output_dir.display());

    if frames.is_empty() {
        return Err(JobError::Input("no frames extracted from video".into()));
    }
    if frames.len() < MIN_FRAMES {
        return Err(JobError::Input(format!(
            "only {} frames extracted, need at least {MIN_FRAMES}",
            frames.len()
        )));
    }

    Ok(frames)
}

/// List extracted frames in chronological order
async fn list_frames(output_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    let mut entries = tokio::fs::read_dir(output_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("jpg") {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}
