//! Sequential, cancellable execution of progress steps on a background worker

pub mod reporter;
pub mod signal;
pub mod tracker;

pub use reporter::{NullReporter, ProgressReporter, TracingReporter};
pub use signal::StepSignal;
pub use tracker::{ProgressStep, ProgressTracker, RunStatus};
