//! Packager
//!
//! Bundles a trained artifact directory into a single zip archive together
//! with a small metadata file. Archive contents are the contract; identical
//! input directories produce archives with identical entries, but not
//! necessarily identical bytes (entry timestamps vary).

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use gsplat_common::{JobError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the metadata entry added to every archive
pub const METADATA_ENTRY: &str = "metadata.json";

/// Job metadata packaged alongside the artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub scene_id: String,
    pub iterations: u32,
    pub fps: f64,
}

fn packaging(e: impl std::fmt::Display) -> JobError {
    JobError::Packaging(e.to_string())
}

/// Collect all files under `dir`, as paths relative to it, sorted
fn collect_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                stack.push(path);
            } else {
                // All entries live under `dir` by construction.
                files.push(path.strip_prefix(dir).expect("path under root").to_path_buf());
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Zip entry name with forward slashes regardless of platform
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Package `artifact_dir` into a zip at `archive_path`
///
/// Blocking; callers on the async runtime should wrap this in
/// `spawn_blocking`.
///
/// # Errors
/// `JobError::Packaging` when the artifact directory is missing or empty,
/// or when the archive cannot be written.
pub fn package(
    artifact_dir: &Path,
    archive_path: &Path,
    metadata: &ArtifactMetadata,
) -> Result<PathBuf> {
    let files = collect_files(artifact_dir)
        .map_err(|e| packaging(format!("unreadable artifact dir: {e}")))?;
    if files.is_empty() {
        return Err(JobError::Packaging(format!(
            "artifact directory is empty: {}",
            artifact_dir.display()
        )));
    }

    let out = File::create(archive_path).map_err(packaging)?;
    let mut writer = ZipWriter::new(out);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for relative in &files {
        let mut source = File::open(artifact_dir.join(relative)).map_err(packaging)?;
        writer
            .start_file(entry_name(relative), options)
            .map_err(packaging)?;
        let mut buffer = Vec::new();
        source.read_to_end(&mut buffer).map_err(packaging)?;
        writer.write_all(&buffer).map_err(packaging)?;
    }

    writer
        .start_file(METADATA_ENTRY, options)
        .map_err(packaging)?;
    let json = serde_json::to_vec_pretty(metadata).map_err(packaging)?;
    writer.write_all(&json).map_err(packaging)?;
    writer.finish().map_err(packaging)?;

    info!(
        "Packaged {} files into {}",
        files.len() + 1,
        archive_path.display()
    );
    Ok(archive_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zip::ZipArchive;

    fn metadata() -> ArtifactMetadata {
        ArtifactMetadata {
            scene_id: "my-scene-123".into(),
            iterations: 30_000,
            fps: 2.0,
        }
    }

    fn archive_entries(path: &Path) -> Vec<String> {
        let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        archive.file_names().map(str::to_string).collect()
    }

    #[test]
    fn test_package_contains_all_files_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("output");
        std::fs::create_dir_all(artifact.join("point_cloud/iteration_30000")).unwrap();
        std::fs::write(artifact.join("cfg_args"), b"args").unwrap();
        std::fs::write(
            artifact.join("point_cloud/iteration_30000/point_cloud.ply"),
            b"ply bytes",
        )
        .unwrap();

        let archive = dir.path().join("my-scene-123.zip");
        let path = package(&artifact, &archive, &metadata()).unwrap();
        assert_eq!(path, archive);

        let mut entries = archive_entries(&archive);
        entries.sort();
        assert_eq!(
            entries,
            [
                "cfg_args",
                "metadata.json",
                "point_cloud/iteration_30000/point_cloud.ply",
            ]
        );
    }

    #[test]
    fn test_metadata_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("output");
        std::fs::create_dir_all(&artifact).unwrap();
        std::fs::write(artifact.join("model.ply"), b"x").unwrap();

        let archive = dir.path().join("scene.zip");
        package(&artifact, &archive, &metadata()).unwrap();

        let mut zip = ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let mut entry = zip.by_name(METADATA_ENTRY).unwrap();
        let mut json = String::new();
        entry.read_to_string(&mut json).unwrap();
        let parsed: ArtifactMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.scene_id, "my-scene-123");
        assert_eq!(parsed.iterations, 30_000);
    }

    #[test]
    fn test_file_contents_survive() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("output");
        std::fs::create_dir_all(&artifact).unwrap();
        std::fs::write(artifact.join("model.ply"), b"splat data").unwrap();

        let archive = dir.path().join("scene.zip");
        package(&artifact, &archive, &metadata()).unwrap();

        let mut zip = ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let mut entry = zip.by_name("model.ply").unwrap();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, b"splat data");
    }

    #[test]
    fn test_deterministic_entry_set() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("output");
        std::fs::create_dir_all(&artifact).unwrap();
        for name in ["b.ply", "a.ply", "c.ply"] {
            std::fs::write(artifact.join(name), name.as_bytes()).unwrap();
        }

        let first = dir.path().join("first.zip");
        let second = dir.path().join("second.zip");
        package(&artifact, &first, &metadata()).unwrap();
        package(&artifact, &second, &metadata()).unwrap();
        assert_eq!(archive_entries(&first), archive_entries(&second));
    }

    #[test]
    fn test_missing_dir_is_packaging_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = package(
            &dir.path().join("nope"),
            &dir.path().join("out.zip"),
            &metadata(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "packaging");
    }

    #[test]
    fn test_empty_dir_is_packaging_error() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("output");
        std::fs::create_dir_all(&artifact).unwrap();
        let err = package(&artifact, &dir.path().join("out.zip"), &metadata()).unwrap_err();
        assert_eq!(err.kind(), "packaging");
        assert!(err.to_string().contains("empty"));
    }
}
