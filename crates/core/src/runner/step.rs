use parking_lot::{Mutex, ReentrantMutex};
use std::io::{BufReader, Read};
use std::process::Child;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{events::Listeners, job::Job, job::JobId};
use crate::{
    command::LaunchSpecBuilder,
    error::{Error, Result},
    messenger::Messenger,
    progress::{ProgressStep, StepSignal},
    project::Project,
    snippets::SnippetResult,
};

const REAP_POLL: Duration = Duration::from_millis(10);

/// Where a queued job's step is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Running,
    Succeeded,
    /// Finished with an error that was handed to the job
    Failed,
    Killed,
    Cancelled,
}

impl StepState {
    pub fn is_done(self) -> bool {
        !matches!(self, StepState::Pending | StepState::Running)
    }

    fn is_stopped(self) -> bool {
        matches!(self, StepState::Killed | StepState::Cancelled)
    }
}

/// Executes one job in its own snippet process
pub(crate) struct SnippetStep {
    id: JobId,
    job: Arc<dyn Job>,
    project: Arc<dyn Project>,
    listeners: Arc<Listeners>,
    messenger: Arc<dyn Messenger>,
    exit_grace: Duration,
    inner: Mutex<StepInner>,
    // held while the job and listeners are being notified
    delivery: ReentrantMutex<()>,
}

struct StepInner {
    state: StepState,
    child: Option<Child>,
    signal: Option<StepSignal>,
}

enum Launch {
    Stopped,
    Finished {
        parsed: Result<SnippetResult>,
        diagnostics: String,
    },
}

impl SnippetStep {
    pub(crate) fn new(
        id: JobId,
        job: Arc<dyn Job>,
        project: Arc<dyn Project>,
        listeners: Arc<Listeners>,
        messenger: Arc<dyn Messenger>,
        exit_grace: Duration,
    ) -> Self {
        Self {
            id,
            job,
            project,
            listeners,
            messenger,
            exit_grace,
            inner: Mutex::new(StepInner {
                state: StepState::Pending,
                child: None,
                signal: None,
            }),
            delivery: ReentrantMutex::new(()),
        }
    }

    pub(crate) fn state(&self) -> StepState {
        self.inner.lock().state
    }

    /// Tear down the process, if any, and mark the step killed.
    /// Returns false if the step had already finished.
    pub(crate) fn kill(&self) -> bool {
        self.stop(StepState::Killed)
    }

    fn stop(&self, target: StepState) -> bool {
        let (child, signal) = {
            let mut inner = self.inner.lock();
            if inner.state.is_done() {
                return false;
            }
            inner.state = target;
            (inner.child.take(), inner.signal.clone())
        };

        if let Some(mut child) = child {
            debug!("{}: terminating snippet process {}", self.id, child.id());
            let _ = child.kill();
            let _ = child.wait();
        }

        // a delivery already under way finishes before the tracker hears about the stop
        let _delivery = self.delivery.lock();
        if let Some(signal) = signal {
            signal.notify();
        }
        true
    }

    fn finish(&self, state: StepState) {
        let signal = {
            let mut inner = self.inner.lock();
            if inner.state != StepState::Running {
                return;
            }
            inner.state = state;
            inner.signal.clone()
        };
        debug!("{}: {:?}", self.id, state);
        if let Some(signal) = signal {
            signal.notify();
        }
    }

    fn execute(&self) {
        let launched = self.launch();

        let _delivery = self.delivery.lock();
        if self.state().is_stopped() {
            debug!("{}: stopped, discarding outcome", self.id);
            return;
        }

        match launched {
            Ok(Launch::Finished {
                parsed,
                diagnostics,
            }) => {
                self.job.got_error_output(&diagnostics);
                match parsed {
                    Ok(result) => {
                        self.job.got_output(&result);
                        self.listeners
                            .publish_result(self.id, &self.job.label(), &result);
                        self.finish(StepState::Succeeded);
                    }
                    Err(e) => self.fail(e),
                }
            }
            Ok(Launch::Stopped) => {}
            Err(e) => self.fail(e),
        }
    }

    fn fail(&self, error: Error) {
        self.messenger
            .log_exception(&format!("Snippet job '{}' failed", self.job.label()), &error);
        self.job.caught_error(&error);
        self.finish(StepState::Failed);
    }

    /// Spawn the snippet, read its single result and reap the process.
    /// `Err` means the process never ran.
    fn launch(&self) -> Result<Launch> {
        let spec = LaunchSpecBuilder::for_project(self.project.as_ref())
            .snippet(self.job.snippet_class(), self.job.snippet_args())
            .build()?;

        let mut child = spec.to_command().spawn().map_err(|source| Error::Spawn {
            program: spec.program.clone(),
            source,
        })?;
        debug!("{}: spawned process {}", self.id, child.id());

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        {
            let mut inner = self.inner.lock();
            if inner.state != StepState::Running {
                drop(inner);
                let _ = child.kill();
                let _ = child.wait();
                return Ok(Launch::Stopped);
            }
            inner.child = Some(child);
        }

        let collector = stderr.map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                if let Err(e) = pipe.read_to_end(&mut buf) {
                    debug!("stderr read ended early: {}", e);
                }
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        let parsed = match stdout {
            Some(pipe) => SnippetResult::read_from(BufReader::new(pipe)),
            None => Err(Error::MissingOutput),
        };

        let grace = if parsed.is_ok() {
            self.exit_grace
        } else {
            Duration::ZERO
        };
        self.reap(grace);

        let diagnostics = match collector {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                warn!("{}: stderr collector panicked", self.id);
                String::new()
            }),
            None => String::new(),
        };

        if self.state().is_stopped() {
            return Ok(Launch::Stopped);
        }
        Ok(Launch::Finished {
            parsed,
            diagnostics,
        })
    }

    /// Let the process exit on its own for up to `grace`, then kill it
    fn reap(&self, grace: Duration) {
        let deadline = Instant::now() + grace;
        loop {
            {
                let mut inner = self.inner.lock();
                let Some(child) = inner.child.as_mut() else {
                    return;
                };
                match child.try_wait() {
                    Ok(Some(status)) => {
                        debug!("{}: process exited with {}", self.id, status);
                        inner.child = None;
                        return;
                    }
                    Ok(None) if Instant::now() < deadline => {}
                    Ok(None) | Err(_) => {
                        debug!("{}: process still running, killing it", self.id);
                        let _ = child.kill();
                        let _ = child.wait();
                        inner.child = None;
                        return;
                    }
                }
            }
            thread::sleep(REAP_POLL);
        }
    }
}

impl ProgressStep for SnippetStep {
    fn label(&self) -> String {
        self.job.label()
    }

    fn start(self: Arc<Self>, signal: StepSignal) {
        {
            let mut inner = self.inner.lock();
            inner.signal = Some(signal.clone());
            if inner.state != StepState::Pending {
                drop(inner);
                signal.notify();
                return;
            }
            inner.state = StepState::Running;
        }

        let step = Arc::clone(&self);
        let spawned = thread::Builder::new()
            .name(format!("injectscope-{}", self.id))
            .spawn(move || step.execute());

        if let Err(e) = spawned {
            self.fail(Error::Io(e));
        }
    }

    fn is_done(&self) -> bool {
        self.state().is_done()
    }

    fn cancel(&self) {
        self.stop(StepState::Cancelled);
    }
}
