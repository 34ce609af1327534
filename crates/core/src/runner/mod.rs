//! Job scheduling: queue snippet jobs, run each in its own process, fan results out

mod events;
mod job;
mod job_runner;
mod step;

pub use events::{ChannelListener, RunEvent, RunListener};
pub use job::{Job, JobId, JobOutcome, SnippetJob};
pub use job_runner::JobRunner;
pub use step::StepState;
