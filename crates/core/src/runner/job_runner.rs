use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use super::{
    events::{Listeners, RunListener},
    job::{Job, JobId},
    step::{SnippetStep, StepState},
};
use crate::{
    config::SchedulerConfig,
    error::Error,
    messenger::Messenger,
    progress::{ProgressReporter, ProgressStep, ProgressTracker, RunStatus, TracingReporter},
    project::Project,
};

/// Queues snippet jobs for one project and runs them as a single cancellable batch.
///
/// Steps execute one at a time in the order they were queued. Per-step
/// failures are handed to the job and logged; they never fail the run.
pub struct JobRunner {
    project: Arc<dyn Project>,
    tracker: ProgressTracker,
    messenger: Arc<dyn Messenger>,
    listeners: Arc<Listeners>,
    steps: Mutex<BTreeMap<JobId, Arc<SnippetStep>>>,
    next_id: AtomicU64,
    exit_grace: Duration,
}

impl JobRunner {
    pub fn new(project: Arc<dyn Project>, messenger: Arc<dyn Messenger>) -> Self {
        Self::with_reporter(
            project,
            messenger,
            Arc::new(TracingReporter),
            &SchedulerConfig::default(),
        )
    }

    pub fn with_reporter(
        project: Arc<dyn Project>,
        messenger: Arc<dyn Messenger>,
        reporter: Arc<dyn ProgressReporter>,
        config: &SchedulerConfig,
    ) -> Self {
        let tracker =
            ProgressTracker::with_poll_interval(reporter, Arc::clone(&messenger), config.poll_interval());
        Self {
            project,
            tracker,
            messenger,
            listeners: Arc::new(Listeners::default()),
            steps: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            exit_grace: config.exit_grace(),
        }
    }

    pub fn project(&self) -> &Arc<dyn Project> {
        &self.project
    }

    pub fn add_listener(&self, listener: Arc<dyn RunListener>) {
        self.listeners.add(listener);
    }

    /// Register a job for the next run. Queuing the same job twice yields two steps.
    pub fn queue(&self, job: Arc<dyn Job>) -> JobId {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!("Queuing {} ({})", id, job.label());

        let step = Arc::new(SnippetStep::new(
            id,
            job,
            Arc::clone(&self.project),
            Arc::clone(&self.listeners),
            Arc::clone(&self.messenger),
            self.exit_grace,
        ));
        self.steps.lock().insert(id, Arc::clone(&step));
        self.tracker.step(step);
        id
    }

    /// Start every queued step as one run.
    ///
    /// Returns immediately; listeners hear about each result and then
    /// exactly one of done or cancelled.
    pub fn run(&self, label: &str, background_automatically: bool) {
        self.prune_finished();
        info!("Running '{}' for project {}", label, self.project.id());

        let listeners = Arc::clone(&self.listeners);
        let started = self
            .tracker
            .go(label, background_automatically, move |status| match status {
                RunStatus::Cancelled => listeners.publish_cancelled(),
                _ => listeners.publish_done(),
            });

        if let Err(e) = started {
            self.messenger
                .log_exception(&format!("Could not start run '{label}'"), &e);
            if !matches!(e, Error::RunInProgress(_)) {
                // the worker never started, so the drained steps will never run
                for step in self.steps.lock().values() {
                    step.cancel();
                }
                self.listeners.publish_cancelled();
            }
        }
    }

    /// Cancel the current run; in-flight and not-yet-started steps are torn down
    pub fn cancel(&self) {
        self.tracker.cancel();
    }

    /// Kill every step and forget about them
    pub fn kill_all(&self) {
        let steps = std::mem::take(&mut *self.steps.lock());
        for (id, step) in steps {
            if step.kill() {
                debug!("Killed {}", id);
            }
        }
    }

    /// Kill one step. Siblings and the run itself keep going.
    pub fn kill(&self, job: JobId) -> bool {
        let step = self.steps.lock().get(&job).cloned();
        match step {
            Some(step) => step.kill(),
            None => false,
        }
    }

    /// Block until the current run is over
    pub fn wait_for(&self) -> RunStatus {
        self.tracker.wait_for()
    }

    pub fn wait_for_timeout(&self, timeout: Duration) -> Option<RunStatus> {
        self.tracker.wait_for_timeout(timeout)
    }

    /// True once every known step is done
    pub fn is_done(&self) -> bool {
        self.steps.lock().values().all(|step| step.is_done())
    }

    /// Unknown or forgotten jobs count as done
    pub fn is_job_done(&self, job: JobId) -> bool {
        self.steps
            .lock()
            .get(&job)
            .is_none_or(|step| step.is_done())
    }

    pub fn step_state(&self, job: JobId) -> Option<StepState> {
        self.steps.lock().get(&job).map(|step| step.state())
    }

    pub fn is_cancelled(&self) -> bool {
        self.tracker.is_cancelled()
    }

    pub fn status(&self) -> RunStatus {
        self.tracker.status()
    }

    fn prune_finished(&self) {
        self.steps.lock().retain(|_, step| !step.is_done());
    }
}

impl Drop for JobRunner {
    fn drop(&mut self) {
        self.kill_all();
    }
}
