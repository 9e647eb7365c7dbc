//! Progress reporting for registration runs.

use crate::common::SharedFn;

/// Progress information emitted while a run executes.
#[derive(Debug, Clone)]
pub struct RegistrationProgress {
    /// Completed steps (0-based).
    pub current: usize,
    /// Total number of steps in this stage.
    pub total: usize,
    /// What the steps count.
    pub stage: RegistrationStage,
}

/// Stage of a registration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStage {
    /// Materializing pairwise registration tasks.
    Pairs,
    /// Iterating timepoints of a timelapse.
    Timepoints,
}

/// Callback type for progress reporting.
pub type ProgressCallback = SharedFn<dyn Fn(RegistrationProgress) + Send + Sync>;

/// Report progress through the callback if one is set.
pub fn report_progress(
    callback: &ProgressCallback,
    current: usize,
    total: usize,
    stage: RegistrationStage,
) {
    if let Some(f) = callback.as_ref() {
        f(RegistrationProgress {
            current,
            total,
            stage,
        });
    }
}
