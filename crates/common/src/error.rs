use thiserror::Error;

/// Job-level errors
///
/// Every stage failure maps into one of these kinds before crossing the job
/// boundary. Only `Upload` is retried (internally, by the uploader); all
/// other kinds fail the job immediately.
#[derive(Debug, Error)]
pub enum JobError {
    /// Bad or unreachable video, bad parameters, zero frames extracted
    #[error("invalid input: {0}")]
    Input(String),

    /// Reconstruction tool failed or produced insufficient pose/point data
    #[error("reconstruction failed: {reason} ({cameras} cameras, {points} points)")]
    Reconstruction {
        reason: String,
        cameras: u64,
        points: u64,
    },

    /// Training process crashed, ran out of GPU memory, or exited non-zero
    #[error("training failed after iteration {last_iteration}: {reason}")]
    Training { reason: String, last_iteration: u32 },

    /// Wall-clock job budget exceeded; the running tool was aborted
    #[error("job timed out after {0}s")]
    Timeout(u64),

    /// Archive creation failed
    #[error("packaging failed: {0}")]
    Packaging(String),

    /// Upload still failing after the bounded retry budget
    #[error("upload failed after {attempts} attempts: {reason}")]
    Upload { reason: String, attempts: u32 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl JobError {
    /// Short machine-readable error kind, used in logs and diagnostics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "input",
            Self::Reconstruction { .. } => "reconstruction",
            Self::Training { .. } => "training",
            Self::Timeout(_) => "timeout",
            Self::Packaging(_) => "packaging",
            Self::Upload { .. } => "upload",
            Self::Io(_) => "io",
        }
    }
}

/// Result type for worker operations
pub type Result<T> = std::result::Result<T, JobError>;
