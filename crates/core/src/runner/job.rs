use parking_lot::Mutex;
use std::fmt;

use crate::{error::Error, snippets::SnippetResult};

/// Identifies one queued step within a [`JobRunner`](super::JobRunner)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub(crate) u64);

impl JobId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// A snippet request and the receiver of its outcome.
///
/// Exactly one of `got_output` or `caught_error` is called per execution,
/// from the step's worker thread. `got_error_output` precedes `got_output`.
/// A killed step calls none of them.
pub trait Job: Send + Sync {
    fn label(&self) -> String;

    fn snippet_class(&self) -> String;

    fn snippet_args(&self) -> Vec<String>;

    fn got_output(&self, result: &SnippetResult);

    /// Whatever the snippet wrote to stderr, possibly empty
    fn got_error_output(&self, _stderr: &str) {}

    fn caught_error(&self, error: &Error);
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum JobOutcome {
    #[default]
    Pending,
    Output {
        result: SnippetResult,
        diagnostics: String,
    },
    Failed(String),
}

/// The stock [`Job`]: remembers whatever happened to it
#[derive(Debug)]
pub struct SnippetJob {
    label: String,
    class_name: String,
    args: Vec<String>,
    diagnostics: Mutex<String>,
    outcome: Mutex<JobOutcome>,
}

impl SnippetJob {
    pub fn new(label: impl Into<String>, class_name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            label: label.into(),
            class_name: class_name.into(),
            args,
            diagnostics: Mutex::new(String::new()),
            outcome: Mutex::new(JobOutcome::Pending),
        }
    }

    pub fn outcome(&self) -> JobOutcome {
        self.outcome.lock().clone()
    }

    pub fn result(&self) -> Option<SnippetResult> {
        match &*self.outcome.lock() {
            JobOutcome::Output { result, .. } => Some(result.clone()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<String> {
        match &*self.outcome.lock() {
            JobOutcome::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.outcome.lock(), JobOutcome::Pending)
    }
}

impl Job for SnippetJob {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn snippet_class(&self) -> String {
        self.class_name.clone()
    }

    fn snippet_args(&self) -> Vec<String> {
        self.args.clone()
    }

    fn got_output(&self, result: &SnippetResult) {
        let diagnostics = std::mem::take(&mut *self.diagnostics.lock());
        *self.outcome.lock() = JobOutcome::Output {
            result: result.clone(),
            diagnostics,
        };
    }

    fn got_error_output(&self, stderr: &str) {
        self.diagnostics.lock().push_str(stderr);
    }

    fn caught_error(&self, error: &Error) {
        *self.outcome.lock() = JobOutcome::Failed(error.to_string());
    }
}
