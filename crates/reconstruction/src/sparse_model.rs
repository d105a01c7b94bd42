//! COLMAP sparse model statistics
//!
//! A sparse model directory holds `cameras.bin`, `images.bin`, and
//! `points3D.bin`. Each file opens with a little-endian u64 record count;
//! that header is all the worker interprets: registered image count from
//! `images.bin` and 3D point count from `points3D.bin`. The records
//! themselves (poses, tracks, intrinsics) are consumed only by the training
//! tool.

use std::io;
use std::path::Path;

/// Size of the reconstruction: registered cameras and sparse points
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReconstructionStats {
    pub cameras: u64,
    pub points: u64,
}

/// Read the leading u64 record count of a COLMAP binary model file
async fn read_record_count(path: &Path) -> io::Result<u64> {
    let bytes = tokio::fs::read(path).await?;
    let header: [u8; 8] = bytes
        .get(..8)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("truncated model file: {}", path.display()),
            )
        })?;
    Ok(u64::from_le_bytes(header))
}

/// Read camera/point counts from a sparse model directory
///
/// # Errors
/// Fails when any of the three model files is missing or shorter than its
/// count header.
pub async fn read_stats(model_dir: &Path) -> io::Result<ReconstructionStats> {
    // cameras.bin is required by the training tool even though only the
    // image and point counts are interpreted here.
    read_record_count(&model_dir.join("cameras.bin")).await?;
    let cameras = read_record_count(&model_dir.join("images.bin")).await?;
    let points = read_record_count(&model_dir.join("points3D.bin")).await?;
    Ok(ReconstructionStats { cameras, points })
}

/// Write a count-only sparse model (headers without records)
///
/// Enough for [`read_stats`]; used by the stub reconstruction tools in
/// tests.
pub fn write_minimal_model(model_dir: &Path, stats: ReconstructionStats) -> io::Result<()> {
    std::fs::create_dir_all(model_dir)?;
    std::fs::write(model_dir.join("cameras.bin"), 1u64.to_le_bytes())?;
    std::fs::write(model_dir.join("images.bin"), stats.cameras.to_le_bytes())?;
    std::fs::write(model_dir.join("points3D.bin"), stats.points.to_le_bytes())?;
    Ok(())
}
