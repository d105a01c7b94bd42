//! Orchestrator
//!
//! Drives one job through the fixed pipeline: download the source video,
//! extract frames, reconstruct camera poses, train the Gaussian Splatting
//! model, package the artifact, and upload it. Stages run strictly in
//! order; the first failure ends the job with a classified error, and the
//! whole run is bounded by a wall-clock timeout that aborts whatever tool
//! is in flight.

mod config;
mod download;
mod progress;

pub use config::{ConfigError, UploadTarget, WorkerConfig, DEFAULT_JOB_TIMEOUT_SECS};
pub use download::download_video;
pub use progress::LoggingProgress;

use std::path::Path;
use std::sync::Arc;

use gsplat_common::{JobError, JobRequest, JobResult, JobStage, ProgressSink, Result};
use gsplat_packager::{package, ArtifactMetadata};
use gsplat_scene_preparer::{extract_input_frames, reconstruct_scene, SceneLayout};
use gsplat_tool_runner::{SubprocessRunner, ToolRunner};
use gsplat_trainer::train;
use gsplat_uploader::{HttpUploader, S3Uploader, Uploader};
use tracing::{error, info, warn};

use crate::progress::ProgressTracker;

/// Runs jobs end to end
pub struct Orchestrator {
    config: WorkerConfig,
    client: reqwest::Client,
    runner: Arc<dyn ToolRunner>,
    uploader: Arc<dyn Uploader>,
    progress: Arc<dyn ProgressSink>,
}

impl Orchestrator {
    /// Build an orchestrator with the production components: subprocess
    /// tools, the configured upload target, progress to the log
    pub fn new(config: WorkerConfig) -> Result<Self> {
        let uploader: Arc<dyn Uploader> = match &config.upload_target {
            UploadTarget::Http => Arc::new(HttpUploader::new(
                config.master_server_url.clone(),
                config.upload_api_key.clone(),
                config.retry,
            )?),
            UploadTarget::S3(s3) => Arc::new(S3Uploader::new(s3.clone(), config.retry)),
        };
        Ok(Self::with_components(
            config,
            Arc::new(SubprocessRunner),
            uploader,
            Arc::new(LoggingProgress),
        ))
    }

    /// Build an orchestrator with caller-supplied components
    pub fn with_components(
        config: WorkerConfig,
        runner: Arc<dyn ToolRunner>,
        uploader: Arc<dyn Uploader>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            runner,
            uploader,
            progress,
        }
    }

    /// Run one job to completion
    ///
    /// Never panics and never returns an error: every outcome, including a
    /// timeout, is folded into the returned `JobResult`.
    pub async fn run_job(&self, request: &JobRequest) -> JobResult {
        let scene_id = request.scene_id_or_generated();
        let tracker = ProgressTracker::new(Arc::clone(&self.progress));
        let workspace = self.config.work_dir.join(&scene_id);

        info!("Starting job {} for {}", scene_id, request.video_url);

        // Dropping the in-flight future on timeout kills whatever child
        // process the runner has open.
        let outcome = match tokio::time::timeout(
            self.config.job_timeout,
            self.execute(request, &scene_id, &workspace, &tracker),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(JobError::Timeout(self.config.job_timeout.as_secs())),
        };

        match outcome {
            Ok(url) => {
                tracker.enter(JobStage::Completed);
                if !self.config.keep_workspace {
                    self.cleanup(&workspace).await;
                }
                info!("Job {} completed: {}", scene_id, url);
                JobResult::success(scene_id, url)
            }
            Err(e) => {
                // The workspace is kept on failure for diagnosis.
                error!(kind = e.kind(), "Job {} failed: {}", scene_id, e);
                JobResult::failure(scene_id, tracker.last(), e.to_string())
            }
        }
    }

    async fn execute(
        &self,
        request: &JobRequest,
        scene_id: &str,
        workspace: &Path,
        tracker: &ProgressTracker,
    ) -> Result<String> {
        validate_request(request)?;
        tracker.enter(JobStage::Received);

        let layout = SceneLayout::new(workspace);
        layout.create().await?;

        tracker.enter(JobStage::Downloading);
        let video_path = workspace.join("video.mp4");
        download_video(&self.client, &request.video_url, &video_path).await?;

        tracker.enter(JobStage::Extracting);
        let frames =
            extract_input_frames(self.runner.as_ref(), &layout, &video_path, request.params.fps)
                .await?;
        info!("Extracted {} frames", frames);

        tracker.enter(JobStage::Reconstructing);
        let stats =
            reconstruct_scene(self.runner.as_ref(), &layout, self.config.thresholds).await?;
        info!(
            "Reconstructed {} cameras, {} points",
            stats.cameras, stats.points
        );

        tracker.enter(JobStage::Training);
        let artifact = train(
            self.runner.as_ref(),
            &self.config.trainer,
            workspace,
            request.params.iterations,
            request.params.checkpoint_interval,
            &|iteration, total| {
                tracker.report(
                    JobStage::Training,
                    gsplat_common::training_progress(iteration, total),
                );
            },
        )
        .await?;

        tracker.enter(JobStage::Packaging);
        let archive_path = workspace.join(format!("{scene_id}.zip"));
        let metadata = ArtifactMetadata {
            scene_id: scene_id.to_string(),
            iterations: artifact.iterations_completed,
            fps: request.params.fps,
        };
        let output_dir = artifact.output_dir.clone();
        let archive = {
            let archive_path = archive_path.clone();
            tokio::task::spawn_blocking(move || package(&output_dir, &archive_path, &metadata))
                .await
                .map_err(|e| JobError::Packaging(format!("packaging task failed: {e}")))??
        };

        tracker.enter(JobStage::Uploading);
        self.uploader.upload(&archive, scene_id).await
    }

    async fn cleanup(&self, workspace: &Path) {
        if let Err(e) = tokio::fs::remove_dir_all(workspace).await {
            warn!("Failed to clean workspace {}: {}", workspace.display(), e);
        }
    }
}

/// Reject obviously bad requests before any work is done
fn validate_request(request: &JobRequest) -> Result<()> {
    if request.params.iterations == 0 {
        return Err(JobError::Input("iteration count must be positive".into()));
    }
    let fps = request.params.fps;
    if !fps.is_finite() || fps <= 0.0 {
        return Err(JobError::Input(format!("invalid fps: {fps}")));
    }
    let url = &request.video_url;
    if !url.starts_with("http://") && !url.starts_with("https://") && !url.starts_with("file://") {
        return Err(JobError::Input(format!("unsupported video URL: {url}")));
    }
    Ok(())
}
