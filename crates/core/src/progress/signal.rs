use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

/// Wakes the tracker when a step finishes or the run is cancelled.
///
/// `notify` takes the lock before signalling, so a waiter that checked its
/// condition under the lock cannot miss a wake-up.
#[derive(Debug, Clone, Default)]
pub struct StepSignal {
    inner: Arc<SignalInner>,
}

#[derive(Debug, Default)]
struct SignalInner {
    lock: Mutex<()>,
    cv: Condvar,
}

impl StepSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        let _guard = self.inner.lock.lock();
        self.inner.cv.notify_all();
    }

    /// Block until `ready` returns true, re-checking at least every `poll`
    pub(crate) fn wait_until(&self, poll: Duration, mut ready: impl FnMut() -> bool) {
        let mut guard = self.inner.lock.lock();
        while !ready() {
            if self.inner.cv.wait_for(&mut guard, poll).timed_out() {
                tracing::trace!("step wait timed out after {:?}, re-checking", poll);
            }
        }
    }
}
