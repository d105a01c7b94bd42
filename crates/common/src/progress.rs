use crate::stage::JobStage;

/// A single coarse-grained progress report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub stage: JobStage,
    /// Percentage in 0-100
    pub percent: u8,
}

/// Receiver for progress updates emitted by the orchestrator
///
/// The hosting runtime plugs in its own sink; tests collect updates to
/// assert monotonicity.
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Map a training iteration onto the 20-95 progress band
///
/// Deterministic and monotonically non-decreasing in `iteration` for a fixed
/// `total`. Values past `total` clamp to 95; packaging and upload own the
/// remaining 95-100.
#[must_use]
pub fn training_progress(iteration: u32, total: u32) -> u8 {
    if total == 0 {
        return JobStage::Training.base_progress();
    }
    let span = u64::from(iteration.min(total)) * 75 / u64::from(total);
    20 + span as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_progress_bounds() {
        assert_eq!(training_progress(0, 30_000), 20);
        assert_eq!(training_progress(30_000, 30_000), 95);
        // Clamped past the end.
        assert_eq!(training_progress(40_000, 30_000), 95);
        // Degenerate total.
        assert_eq!(training_progress(5, 0), 20);
    }

    #[test]
    fn test_training_progress_is_monotonic() {
        let total = 30_000;
        let mut last = 0;
        for iteration in (0..=total).step_by(500) {
            let p = training_progress(iteration, total);
            assert!(p >= last, "regressed at iteration {iteration}");
            assert!((20..=95).contains(&p));
            last = p;
        }
    }

    #[test]
    fn test_training_progress_midpoint() {
        assert_eq!(training_progress(15_000, 30_000), 57);
    }
}
