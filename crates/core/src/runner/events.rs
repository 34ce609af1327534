use parking_lot::RwLock;
use std::sync::{Arc, mpsc::Sender};

use super::job::JobId;
use crate::snippets::SnippetResult;

/// Subscriber for run events.
///
/// Called on the run's worker thread, in the order events are produced.
/// `accept_done` or `accept_user_cancelled` fires once per run, after every
/// result of that run.
pub trait RunListener: Send + Sync {
    fn accept_result(&self, job: JobId, label: &str, result: &SnippetResult);

    fn accept_done(&self);

    fn accept_user_cancelled(&self);
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Result {
        job: JobId,
        label: String,
        result: SnippetResult,
    },
    Done,
    UserCancelled,
}

/// Forwards every event into a channel; a dropped receiver is ignored
pub struct ChannelListener {
    sender: Sender<RunEvent>,
}

impl ChannelListener {
    pub fn new(sender: Sender<RunEvent>) -> Self {
        Self { sender }
    }
}

impl RunListener for ChannelListener {
    fn accept_result(&self, job: JobId, label: &str, result: &SnippetResult) {
        let _ = self.sender.send(RunEvent::Result {
            job,
            label: label.to_string(),
            result: result.clone(),
        });
    }

    fn accept_done(&self) {
        let _ = self.sender.send(RunEvent::Done);
    }

    fn accept_user_cancelled(&self) {
        let _ = self.sender.send(RunEvent::UserCancelled);
    }
}

/// The listener set shared by all steps of one runner
#[derive(Default)]
pub(crate) struct Listeners {
    inner: RwLock<Vec<Arc<dyn RunListener>>>,
}

impl Listeners {
    pub(crate) fn add(&self, listener: Arc<dyn RunListener>) {
        self.inner.write().push(listener);
    }

    fn snapshot(&self) -> Vec<Arc<dyn RunListener>> {
        self.inner.read().clone()
    }

    pub(crate) fn publish_result(&self, job: JobId, label: &str, result: &SnippetResult) {
        for listener in self.snapshot() {
            listener.accept_result(job, label, result);
        }
    }

    pub(crate) fn publish_done(&self) {
        for listener in self.snapshot() {
            listener.accept_done();
        }
    }

    pub(crate) fn publish_cancelled(&self) {
        for listener in self.snapshot() {
            listener.accept_user_cancelled();
        }
    }
}
