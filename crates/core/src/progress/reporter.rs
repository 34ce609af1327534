use super::tracker::RunStatus;

/// Host-side progress surface for a run.
///
/// `user_visible` is false for runs that were asked to go to the background
/// automatically; it changes presentation only, never execution.
pub trait ProgressReporter: Send + Sync {
    fn begin(&self, _label: &str, _total_steps: usize, _user_visible: bool) {}

    fn step_started(&self, _label: &str) {}

    fn worked(&self, _completed: usize, _total: usize) {}

    fn finished(&self, _status: RunStatus) {}

    /// Lets the host's progress UI request cancellation
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Reports progress through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn begin(&self, label: &str, total_steps: usize, user_visible: bool) {
        tracing::info!(user_visible, "{} ({} steps)", label, total_steps);
    }

    fn step_started(&self, label: &str) {
        tracing::debug!("Starting step: {}", label);
    }

    fn worked(&self, completed: usize, total: usize) {
        tracing::debug!("Progress: {}/{}", completed, total);
    }

    fn finished(&self, status: RunStatus) {
        tracing::info!("Run finished: {:?}", status);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {}
