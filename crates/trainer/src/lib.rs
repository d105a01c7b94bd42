//! Trainer
//!
//! Invokes the external Gaussian Splatting training routine against a
//! prepared scene directory. The routine is one long-lived GPU computation;
//! this crate only launches it, scrapes iteration numbers from its stdout
//! for progress reporting, and classifies its exit.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use gsplat_common::{JobError, Result};
use gsplat_tool_runner::{ToolCommand, ToolRunner};
use serde::{Deserialize, Serialize};
use tracing::info;

/// How the training tool is launched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Interpreter or binary to run
    pub program: String,
    /// Training script passed as first argument; empty to run `program`
    /// directly
    pub script: String,
    /// Working directory of the training process
    pub workdir: Option<PathBuf>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            script: "train.py".to_string(),
            workdir: None,
        }
    }
}

/// The finalized output of a training run
#[derive(Debug, Clone)]
pub struct TrainingArtifact {
    /// Directory holding the final checkpoint (point cloud + learned
    /// attributes)
    pub output_dir: PathBuf,
    /// Iterations actually completed
    pub iterations_completed: u32,
}

/// Pull an iteration number out of a training log line
///
/// Accepts the common shapes training tools print, e.g.
/// `Iteration 7000/30000` or `iteration: 7000`. Returns the first integer
/// following the word "iteration".
#[must_use]
pub fn parse_iteration(line: &str) -> Option<u32> {
    let lower = line.to_ascii_lowercase();
    let at = lower.find("iteration")?;
    let rest = &lower[at + "iteration".len()..];
    let digits: String = rest
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Train a prepared scene for `iterations` iterations
///
/// `on_iteration` receives `(current, total)` whenever the tool reports
/// progress; calls are monotonically non-decreasing in `current`.
///
/// # Errors
/// `JobError::Training` carrying the last iteration reached when the
/// process crashes, runs out of GPU memory, or exits non-zero. The run is
/// not resumable.
pub async fn train(
    runner: &dyn ToolRunner,
    config: &TrainerConfig,
    scene_dir: &Path,
    iterations: u32,
    checkpoint_interval: Option<u32>,
    on_iteration: &(dyn Fn(u32, u32) + Send + Sync),
) -> Result<TrainingArtifact> {
    if iterations == 0 {
        return Err(JobError::Input("iteration count must be positive".into()));
    }

    let output_dir = scene_dir.join("output");
    let mut command = ToolCommand::new(&config.program);
    if !config.script.is_empty() {
        command = command.arg(&config.script);
    }
    command = command
        .args(["-s".to_string(), scene_dir.display().to_string()])
        .args(["-m".to_string(), output_dir.display().to_string()])
        .arg(format!("--iterations={iterations}"));
    if let Some(interval) = checkpoint_interval {
        command = command.arg(format!("--save_iterations={interval}"));
    }
    if let Some(workdir) = &config.workdir {
        command = command.current_dir(workdir);
    }

    info!("Starting training for {} iterations", iterations);

    let last_iteration = AtomicU32::new(0);
    let result = runner
        .run_with_output_lines(command, &|line| {
            if let Some(iteration) = parse_iteration(line) {
                // Ignore out-of-order noise so reported progress never
                // regresses.
                let prev = last_iteration.fetch_max(iteration, Ordering::Relaxed);
                if iteration >= prev {
                    on_iteration(iteration, iterations);
                }
            }
        })
        .await;

    let reached = last_iteration.load(Ordering::Relaxed);
    match result {
        Ok(_) => {
            info!("Training completed at iteration {}", iterations);
            Ok(TrainingArtifact {
                output_dir,
                iterations_completed: iterations,
            })
        }
        Err(e) => Err(JobError::Training {
            reason: e.to_string(),
            last_iteration: reached,
        }),
    }
}
