//! Scene preparer
//!
//! Stages a video into the exact directory layout the training tool
//! expects, then validates that structure-from-motion recovered enough of
//! the scene to make training worthwhile.
//!
//! Layout under the scene root:
//!
//! ```text
//! <scene>/
//! ├── input/            # extracted frames
//! ├── images/           # training-facing copy of the frames
//! ├── sparse/0/         # COLMAP sparse reconstruction
//! ├── database.db       # COLMAP feature database
//! └── output/           # training artifact (written by the trainer)
//! ```

use std::path::{Path, PathBuf};

use gsplat_common::{JobError, Result};
use gsplat_frame_extractor::extract_frames;
use gsplat_reconstruction::{reconstruct, ReconstructionStats, ReconstructionThresholds};
use gsplat_tool_runner::ToolRunner;
use tracing::info;

/// The fixed on-disk layout of one scene workspace
#[derive(Debug, Clone)]
pub struct SceneLayout {
    root: PathBuf,
}

impl SceneLayout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Raw extracted frames
    #[must_use]
    pub fn input_dir(&self) -> PathBuf {
        self.root.join("input")
    }

    /// Frames as consumed by reconstruction and training
    #[must_use]
    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    /// COLMAP sparse reconstruction output
    #[must_use]
    pub fn sparse_dir(&self) -> PathBuf {
        self.root.join("sparse")
    }

    /// Training artifact directory
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    /// Create the workspace root and artifact directory
    pub async fn create(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::create_dir_all(self.output_dir()).await?;
        Ok(())
    }
}

/// Extract frames into `input/` and mirror them into `images/`
///
/// Returns the number of frames staged.
pub async fn extract_input_frames(
    runner: &dyn ToolRunner,
    layout: &SceneLayout,
    video_path: &Path,
    fps: f64,
) -> Result<usize> {
    // Leftover frames from a kept workspace would inflate the count.
    let input_dir = layout.input_dir();
    if tokio::fs::try_exists(&input_dir).await? {
        tokio::fs::remove_dir_all(&input_dir).await?;
    }
    let frames = extract_frames(runner, video_path, &input_dir, fps).await?;

    // The training tool reads images/; keep input/ as the pristine source.
    let images_dir = layout.images_dir();
    if tokio::fs::try_exists(&images_dir).await? {
        tokio::fs::remove_dir_all(&images_dir).await?;
    }
    tokio::fs::create_dir_all(&images_dir).await?;
    for frame in &frames {
        let name = frame
            .file_name()
            .ok_or_else(|| JobError::Input(format!("bad frame path: {}", frame.display())))?;
        tokio::fs::copy(frame, images_dir.join(name)).await?;
    }

    info!("Staged {} frames into {}", frames.len(), images_dir.display());
    Ok(frames.len())
}

/// Run reconstruction over the staged images and enforce the minimum size
///
/// # Errors
/// `JobError::Reconstruction` carrying the observed counts when the model is
/// below `thresholds`; a degenerate reconstruction is a failure, not a
/// crash, and must fail the job before any GPU time is spent on training.
pub async fn reconstruct_scene(
    runner: &dyn ToolRunner,
    layout: &SceneLayout,
    thresholds: ReconstructionThresholds,
) -> Result<ReconstructionStats> {
    let stats = reconstruct(runner, layout.root(), &layout.images_dir()).await?;
    if !thresholds.accepts(stats) {
        return Err(JobError::Reconstruction {
            reason: format!(
                "below minimum of {} cameras / {} points",
                thresholds.min_cameras, thresholds.min_points
            ),
            cameras: stats.cameras,
            points: stats.points,
        });
    }
    Ok(stats)
}

/// Prepare a complete scene from a video: frames, then reconstruction
///
/// Writes only under the scene root; the input video is never mutated.
pub async fn prepare(
    runner: &dyn ToolRunner,
    video_path: &Path,
    scene_root: &Path,
    fps: f64,
    thresholds: ReconstructionThresholds,
) -> Result<ReconstructionStats> {
    let layout = SceneLayout::new(scene_root);
    layout.create().await?;
    extract_input_frames(runner, &layout, video_path, fps).await?;
    reconstruct_scene(runner, &layout, thresholds).await
}
