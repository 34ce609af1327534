use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::{reporter::ProgressReporter, signal::StepSignal};
use crate::{
    error::{Error, Result},
    messenger::Messenger,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lifecycle of one run: `Idle -> Running -> {Completed, Cancelled}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Cancelled)
    }
}

/// One unit of work executed by the tracker's worker.
///
/// `start` must return promptly; long work happens elsewhere and reports
/// completion through `is_done` plus a `StepSignal::notify`.
pub trait ProgressStep: Send + Sync {
    fn label(&self) -> String;

    fn start(self: Arc<Self>, signal: StepSignal);

    fn is_done(&self) -> bool;

    /// Called once the step is done and the run was not cancelled
    fn complete(&self) {}

    /// Tear the step down; it must report done afterwards
    fn cancel(&self);
}

/// Runs queued steps in submission order on a single background worker
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    pending: Mutex<Vec<Arc<dyn ProgressStep>>>,
    // steps appended to the run in progress; guarded by `status` for admission
    late: Mutex<Vec<Arc<dyn ProgressStep>>>,
    accepting_late: AtomicBool,
    status: Mutex<RunStatus>,
    finished: Condvar,
    cancelled: AtomicBool,
    signal: StepSignal,
    reporter: Arc<dyn ProgressReporter>,
    messenger: Arc<dyn Messenger>,
    poll_interval: Duration,
}

impl ProgressTracker {
    pub fn new(reporter: Arc<dyn ProgressReporter>, messenger: Arc<dyn Messenger>) -> Self {
        Self::with_poll_interval(reporter, messenger, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(
        reporter: Arc<dyn ProgressReporter>,
        messenger: Arc<dyn Messenger>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                pending: Mutex::new(Vec::new()),
                late: Mutex::new(Vec::new()),
                accepting_late: AtomicBool::new(false),
                status: Mutex::new(RunStatus::Idle),
                finished: Condvar::new(),
                cancelled: AtomicBool::new(false),
                signal: StepSignal::new(),
                reporter,
                messenger,
                poll_interval,
            }),
        }
    }

    /// Queue a step for the next run
    pub fn step(&self, step: Arc<dyn ProgressStep>) {
        self.inner.pending.lock().push(step);
    }

    /// Append a step to the run in progress so it executes before the run ends.
    ///
    /// Returns false when no run is accepting steps: nothing is running, or
    /// the running one is already finishing. The step is not queued then.
    pub fn join_running(&self, step: Arc<dyn ProgressStep>) -> bool {
        let status = self.inner.status.lock();
        if *status != RunStatus::Running || !self.inner.accepting_late.load(Ordering::SeqCst) {
            return false;
        }
        debug!("Step '{}' joins the running run", step.label());
        self.inner.late.lock().push(step);
        true
    }

    pub fn pending_steps(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Start a run over every queued step.
    ///
    /// `on_finish` is invoked on the worker with the terminal status before
    /// any `wait_for` caller is released.
    pub fn go<F>(&self, label: &str, background_automatically: bool, on_finish: F) -> Result<()>
    where
        F: FnOnce(RunStatus) + Send + 'static,
    {
        {
            let mut status = self.inner.status.lock();
            if *status == RunStatus::Running {
                return Err(Error::RunInProgress(label.to_string()));
            }
            *status = RunStatus::Running;
            self.inner.accepting_late.store(true, Ordering::SeqCst);
        }
        self.inner.cancelled.store(false, Ordering::SeqCst);

        let steps = std::mem::take(&mut *self.inner.pending.lock());
        let inner = Arc::clone(&self.inner);
        let run_label = label.to_string();

        let spawned = thread::Builder::new()
            .name("injectscope-run".to_string())
            .spawn(move || {
                let status = inner.run_steps(&run_label, !background_automatically, steps);
                on_finish(status);
                inner.finish(status);
            });

        if let Err(e) = spawned {
            let mut status = self.inner.status.lock();
            self.inner.accepting_late.store(false, Ordering::SeqCst);
            *status = RunStatus::Idle;
            drop(status);
            self.inner.finished.notify_all();
            return Err(Error::Io(e));
        }
        Ok(())
    }

    /// Cancel the current run; not-yet-started steps never start
    pub fn cancel(&self) {
        debug!("Cancelling run");
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.signal.notify();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    pub fn status(&self) -> RunStatus {
        *self.inner.status.lock()
    }

    pub fn is_running(&self) -> bool {
        self.status() == RunStatus::Running
    }

    /// Block until the current run reaches a terminal state.
    /// Returns immediately with `Idle` if nothing was ever started.
    pub fn wait_for(&self) -> RunStatus {
        let mut status = self.inner.status.lock();
        while *status == RunStatus::Running {
            self.inner.finished.wait(&mut status);
        }
        *status
    }

    /// Like [`wait_for`](Self::wait_for) but gives up after `timeout`
    pub fn wait_for_timeout(&self, timeout: Duration) -> Option<RunStatus> {
        let deadline = Instant::now() + timeout;
        let mut status = self.inner.status.lock();
        while *status == RunStatus::Running {
            if self
                .inner
                .finished
                .wait_until(&mut status, deadline)
                .timed_out()
            {
                return (*status != RunStatus::Running).then_some(*status);
            }
        }
        Some(*status)
    }
}

impl TrackerInner {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.reporter.is_cancelled()
    }

    fn run_steps(
        &self,
        label: &str,
        user_visible: bool,
        steps: Vec<Arc<dyn ProgressStep>>,
    ) -> RunStatus {
        let mut total = steps.len();
        let mut finished = 0;
        self.reporter.begin(label, total, user_visible);
        debug!("Run '{}' started with {} steps", label, total);

        let mut batch = steps;
        loop {
            for step in batch {
                finished += 1;
                if self.run_step(&step) {
                    self.reporter.worked(finished, total);
                }
            }

            batch = self.take_late_steps();
            if batch.is_empty() {
                break;
            }
            total += batch.len();
            debug!("{} steps joined run '{}'", batch.len(), label);
        }

        let status = if self.is_cancelled() {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        };
        self.reporter.finished(status);
        debug!("Run '{}' finished: {:?}", label, status);
        status
    }

    /// Returns true when the step ran to completion
    fn run_step(&self, step: &Arc<dyn ProgressStep>) -> bool {
        let step_label = step.label();

        if self.is_cancelled() {
            debug!("Skipping step '{}': run cancelled", step_label);
            step.cancel();
            return false;
        }

        self.reporter.step_started(&step_label);
        Arc::clone(step).start(self.signal.clone());

        self.signal
            .wait_until(self.poll_interval, || self.is_cancelled() || step.is_done());

        if self.is_cancelled() {
            self.messenger
                .log_message(&format!("Step '{step_label}' cancelled"));
            step.cancel();
            false
        } else {
            step.complete();
            true
        }
    }

    /// Hand over late steps, or close admission once there are none left
    fn take_late_steps(&self) -> Vec<Arc<dyn ProgressStep>> {
        let _status = self.status.lock();
        let mut late = self.late.lock();
        if late.is_empty() {
            self.accepting_late.store(false, Ordering::SeqCst);
        }
        std::mem::take(&mut *late)
    }

    fn finish(&self, status: RunStatus) {
        *self.status.lock() = status;
        self.finished.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messenger::NullMessenger;
    use crate::progress::reporter::NullReporter;
    use std::sync::atomic::AtomicUsize;

    /// Finishes on a helper thread after `delay`, recording the order it ran in
    struct TimedStep {
        name: String,
        delay: Duration,
        done: AtomicBool,
        cancelled: AtomicBool,
        completed: AtomicBool,
        order: Arc<Mutex<Vec<String>>>,
    }

    impl TimedStep {
        fn new(name: &str, delay: Duration, order: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                delay,
                done: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
                completed: AtomicBool::new(false),
                order,
            })
        }
    }

    impl ProgressStep for TimedStep {
        fn label(&self) -> String {
            self.name.clone()
        }

        fn start(self: Arc<Self>, signal: StepSignal) {
            self.order.lock().push(self.name.clone());
            thread::spawn(move || {
                thread::sleep(self.delay);
                self.done.store(true, Ordering::SeqCst);
                signal.notify();
            });
        }

        fn is_done(&self) -> bool {
            self.done.load(Ordering::SeqCst) || self.cancelled.load(Ordering::SeqCst)
        }

        fn complete(&self) {
            self.completed.store(true, Ordering::SeqCst);
        }

        fn cancel(&self) {
            self.cancelled.store(true, Ordering::SeqCst);
        }
    }

    struct CancelledReporter;

    impl ProgressReporter for CancelledReporter {
        fn is_cancelled(&self) -> bool {
            true
        }
    }

    fn tracker() -> ProgressTracker {
        ProgressTracker::with_poll_interval(
            Arc::new(NullReporter),
            Arc::new(NullMessenger),
            Duration::from_millis(10),
        )
    }

    #[test]
    fn test_steps_run_in_submission_order() {
        let tracker = tracker();
        let order = Arc::new(Mutex::new(Vec::new()));
        let steps: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|name| TimedStep::new(name, Duration::from_millis(5), Arc::clone(&order)))
            .collect();
        for step in &steps {
            tracker.step(step.clone());
        }

        tracker.go("ordered", true, |_| {}).unwrap();
        assert_eq!(tracker.wait_for(), RunStatus::Completed);

        assert_eq!(*order.lock(), vec!["a", "b", "c"]);
        assert!(steps.iter().all(|s| s.completed.load(Ordering::SeqCst)));
        assert_eq!(tracker.pending_steps(), 0);
    }

    #[test]
    fn test_wait_for_without_run_is_idle() {
        assert_eq!(tracker().wait_for(), RunStatus::Idle);
    }

    #[test]
    fn test_empty_run_completes() {
        let tracker = tracker();
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&finished);
        tracker
            .go("empty", true, move |status| {
                assert_eq!(status, RunStatus::Completed);
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(tracker.wait_for(), RunStatus::Completed);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancelled_reporter_prevents_any_step_from_starting() {
        let tracker = ProgressTracker::with_poll_interval(
            Arc::new(CancelledReporter),
            Arc::new(NullMessenger),
            Duration::from_millis(10),
        );
        let order = Arc::new(Mutex::new(Vec::new()));
        let step = TimedStep::new("never", Duration::ZERO, Arc::clone(&order));
        tracker.step(step.clone());

        tracker.go("cancelled", false, |_| {}).unwrap();
        assert_eq!(tracker.wait_for(), RunStatus::Cancelled);
        assert!(order.lock().is_empty());
        assert!(step.cancelled.load(Ordering::SeqCst));
        assert!(!step.completed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_cancel_mid_run_tears_down_current_step() {
        let tracker = tracker();
        let order = Arc::new(Mutex::new(Vec::new()));
        let slow = TimedStep::new("slow", Duration::from_secs(30), Arc::clone(&order));
        let next = TimedStep::new("next", Duration::ZERO, Arc::clone(&order));
        tracker.step(slow.clone());
        tracker.step(next.clone());

        tracker.go("cancel me", true, |_| {}).unwrap();
        while order.lock().is_empty() {
            thread::sleep(Duration::from_millis(1));
        }
        tracker.cancel();

        assert_eq!(
            tracker.wait_for_timeout(Duration::from_secs(5)),
            Some(RunStatus::Cancelled)
        );
        assert!(slow.cancelled.load(Ordering::SeqCst));
        assert!(next.cancelled.load(Ordering::SeqCst));
        assert_eq!(*order.lock(), vec!["slow"]);
    }

    #[test]
    fn test_second_go_while_running_is_rejected() {
        let tracker = tracker();
        let order = Arc::new(Mutex::new(Vec::new()));
        tracker.step(TimedStep::new("slow", Duration::from_millis(200), order));

        tracker.go("first", true, |_| {}).unwrap();
        let second = tracker.go("second", true, |_| {});
        assert!(matches!(second, Err(Error::RunInProgress(_))));
        assert_eq!(tracker.wait_for(), RunStatus::Completed);
    }

    #[test]
    fn test_go_clears_previous_cancellation() {
        let tracker = tracker();
        tracker.cancel();
        assert!(tracker.is_cancelled());

        tracker.go("fresh", true, |_| {}).unwrap();
        assert_eq!(tracker.wait_for(), RunStatus::Completed);
        assert!(!tracker.is_cancelled());
    }

    #[test]
    fn test_join_running_executes_step_before_run_ends() {
        let tracker = tracker();
        let order = Arc::new(Mutex::new(Vec::new()));
        tracker.step(TimedStep::new(
            "first",
            Duration::from_millis(150),
            Arc::clone(&order),
        ));
        let late = TimedStep::new("late", Duration::from_millis(5), Arc::clone(&order));

        tracker.go("joinable", true, |_| {}).unwrap();
        assert!(tracker.join_running(late.clone()));

        assert_eq!(tracker.wait_for(), RunStatus::Completed);
        assert_eq!(*order.lock(), vec!["first", "late"]);
        assert!(late.completed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_join_running_without_run_is_refused() {
        let tracker = tracker();
        let order = Arc::new(Mutex::new(Vec::new()));
        let step = TimedStep::new("idle", Duration::from_millis(5), Arc::clone(&order));

        assert!(!tracker.join_running(step.clone()));
        assert_eq!(tracker.pending_steps(), 0);

        tracker.go("after", true, |_| {}).unwrap();
        assert_eq!(tracker.wait_for(), RunStatus::Completed);
        assert!(!tracker.join_running(step));
        assert!(order.lock().is_empty());
    }
}
