#![allow(dead_code)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use injectscope::{
    ClasspathProject, JobRunner, NullMessenger, Project,
    config::SchedulerConfig,
    progress::{NullReporter, ProgressReporter},
};

/// A project whose runtime is `sh -c <script>`.
///
/// The launcher appends `-classpath <cp> <class> <args..>`, so inside the
/// script `$2` is the snippet class and `$3` its first argument.
pub fn sh_project(script: &str) -> ClasspathProject {
    ClasspathProject::new("demo")
        .with_runtime("sh", vec!["-c".to_string(), script.to_string()])
        .with_snippets_classpath("snippets.jar")
        .with_project_classpath("classes")
        .with_delimiter(":")
}

pub fn scheduler() -> SchedulerConfig {
    SchedulerConfig {
        poll_interval_ms: 10,
        exit_grace_ms: 200,
        background: true,
    }
}

pub fn runner(project: impl Project + 'static) -> JobRunner {
    runner_with_reporter(project, Arc::new(NullReporter))
}

pub fn runner_with_reporter(
    project: impl Project + 'static,
    reporter: Arc<dyn ProgressReporter>,
) -> JobRunner {
    JobRunner::with_reporter(
        Arc::new(project),
        Arc::new(NullMessenger),
        reporter,
        &scheduler(),
    )
}

pub fn wait_until(what: &str, mut ready: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !ready() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}
