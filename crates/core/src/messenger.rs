//! Logging and display sink used for notable failures

use crate::error::Error;

/// Sink for messages the host may want to log or surface.
///
/// Implementations must not panic; nothing reported here flows back into the scheduler.
pub trait Messenger: Send + Sync {
    fn log_message(&self, message: &str);

    fn log_exception(&self, label: &str, error: &Error);

    /// Show a message to the user
    fn display(&self, message: &str);
}

/// Forwards everything to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMessenger;

impl Messenger for TracingMessenger {
    fn log_message(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn log_exception(&self, label: &str, error: &Error) {
        tracing::warn!(error = %error, "{}", label);
    }

    fn display(&self, message: &str) {
        tracing::info!(target: "injectscope::display", "{}", message);
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMessenger;

impl Messenger for NullMessenger {
    fn log_message(&self, _message: &str) {}

    fn log_exception(&self, _label: &str, _error: &Error) {}

    fn display(&self, _message: &str) {}
}
