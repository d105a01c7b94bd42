//! Common types shared across the Gaussian Splatting worker
//!
//! Defines the job request/result wire contract, the error taxonomy, the
//! pipeline stage machine, and the progress reporting model.

mod error;
mod job;
mod progress;
mod stage;

pub use error::{JobError, Result};
pub use job::{JobRequest, JobResult, JobStatus, TrainParams};
pub use progress::{training_progress, ProgressSink, ProgressUpdate};
pub use stage::JobStage;
