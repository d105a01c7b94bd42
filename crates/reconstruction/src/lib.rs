//! Pose reconstructor
//!
//! Runs the COLMAP structure-from-motion pipeline (feature extraction,
//! exhaustive matching, sparse mapping) against a directory of frames and
//! reads back how much it recovered. Camera poses and the sparse point cloud
//! themselves stay opaque; only the registered camera and 3D point counts
//! are interpreted here, to decide whether training is worth starting.

mod sparse_model;

pub use sparse_model::{read_stats, write_minimal_model, ReconstructionStats};

use std::path::Path;

use gsplat_common::{JobError, Result};
use gsplat_tool_runner::{ToolCommand, ToolRunner};
use tracing::info;

/// Minimum reconstruction size accepted for training
///
/// Policy values, not COLMAP limits: a model below these bounds would waste
/// GPU time in training. Defaults follow the "at least two registered
/// cameras, tens of points" rule.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct ReconstructionThresholds {
    pub min_cameras: u64,
    pub min_points: u64,
}

impl Default for ReconstructionThresholds {
    fn default() -> Self {
        Self {
            min_cameras: 2,
            min_points: 50,
        }
    }
}

impl ReconstructionThresholds {
    /// Whether a reconstruction of this size is usable for training
    #[must_use]
    pub fn accepts(&self, stats: ReconstructionStats) -> bool {
        stats.cameras >= self.min_cameras && stats.points >= self.min_points
    }
}

fn tool_failure(reason: String) -> JobError {
    JobError::Reconstruction {
        reason,
        cameras: 0,
        points: 0,
    }
}

/// Run the full COLMAP pipeline against `image_dir`, writing the database
/// and sparse model under `scene_dir`.
///
/// Layout after success: `scene_dir/database.db` and
/// `scene_dir/sparse/0/{cameras,images,points3D}.bin` (COLMAP numbers models
/// from zero; the first model is used when several exist).
///
/// # Errors
/// `JobError::Reconstruction` when any COLMAP step exits non-zero or the
/// sparse model is missing or unreadable afterwards.
pub async fn reconstruct(
    runner: &dyn ToolRunner,
    scene_dir: &Path,
    image_dir: &Path,
) -> Result<ReconstructionStats> {
    let database = scene_dir.join("database.db");
    let sparse_dir = scene_dir.join("sparse");

    // A stale database from a previous attempt would poison the matcher.
    if tokio::fs::try_exists(&database).await? {
        tokio::fs::remove_file(&database).await?;
    }
    tokio::fs::create_dir_all(&sparse_dir).await?;

    info!("Running COLMAP feature extraction");
    runner
        .run(
            ToolCommand::new("colmap")
                .arg("feature_extractor")
                .args(["--database_path".to_string(), database.display().to_string()])
                .args(["--image_path".to_string(), image_dir.display().to_string()])
                .args(["--ImageReader.camera_model", "OPENCV"])
                .args(["--ImageReader.single_camera", "1"])
                .args(["--SiftExtraction.use_gpu", "1"]),
        )
        .await
        .map_err(|e| tool_failure(format!("feature extraction failed: {e}")))?;

    info!("Running COLMAP exhaustive matching");
    runner
        .run(
            ToolCommand::new("colmap")
                .arg("exhaustive_matcher")
                .args(["--database_path".to_string(), database.display().to_string()])
                .args(["--SiftMatching.use_gpu", "1"]),
        )
        .await
        .map_err(|e| tool_failure(format!("feature matching failed: {e}")))?;

    info!("Running COLMAP mapper");
    runner
        .run(
            ToolCommand::new("colmap")
                .arg("mapper")
                .args(["--database_path".to_string(), database.display().to_string()])
                .args(["--image_path".to_string(), image_dir.display().to_string()])
                .args(["--output_path".to_string(), sparse_dir.display().to_string()])
                .args(["--Mapper.ba_refine_focal_length", "0"])
                .args(["--Mapper.ba_refine_extra_params", "0"]),
        )
        .await
        .map_err(|e| tool_failure(format!("sparse mapping failed: {e}")))?;

    let model_dir = locate_model(&sparse_dir).await?;
    let stats = read_stats(&model_dir)
        .await
        .map_err(|e| tool_failure(format!("unreadable sparse model: {e}")))?;

    info!(
        "Sparse reconstruction at {}: {} cameras, {} points",
        model_dir.display(),
        stats.cameras,
        stats.points
    );
    Ok(stats)
}

/// Find the sparse model directory, preferring `sparse/0`
async fn locate_model(sparse_dir: &Path) -> Result<std::path::PathBuf> {
    let preferred = sparse_dir.join("0");
    if tokio::fs::try_exists(&preferred).await? {
        return Ok(preferred);
    }

    // The mapper occasionally numbers its first model differently; take the
    // first one present.
    let mut entries = tokio::fs::read_dir(sparse_dir).await?;
    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            candidates.push(entry.path());
        }
    }
    candidates.sort();
    candidates.into_iter().next().ok_or_else(|| {
        tool_failure("mapper produced no sparse reconstruction".into())
    })
}
