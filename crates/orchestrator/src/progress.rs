use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use gsplat_common::{JobStage, ProgressSink, ProgressUpdate};
use tracing::info;

/// Per-job progress state
///
/// Reported percentages never regress: a late or out-of-order value is
/// clamped to the highest one already emitted before reaching the sink.
pub(crate) struct ProgressTracker {
    sink: Arc<dyn ProgressSink>,
    last: AtomicU8,
}

impl ProgressTracker {
    pub(crate) fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            sink,
            last: AtomicU8::new(0),
        }
    }

    /// Report entry into `stage` at its base percentage
    pub(crate) fn enter(&self, stage: JobStage) {
        self.report(stage, stage.base_progress());
    }

    /// Report an explicit percentage within `stage`
    pub(crate) fn report(&self, stage: JobStage, percent: u8) {
        let prev = self.last.fetch_max(percent, Ordering::Relaxed);
        self.sink.report(ProgressUpdate {
            stage,
            percent: percent.max(prev),
        });
    }

    /// Highest percentage reported so far
    pub(crate) fn last(&self) -> u8 {
        self.last.load(Ordering::Relaxed)
    }
}

/// Default sink: progress goes to the log
pub struct LoggingProgress;

impl ProgressSink for LoggingProgress {
    fn report(&self, update: ProgressUpdate) {
        info!(
            stage = update.stage.name(),
            percent = update.percent,
            "progress"
        );
    }
}
