use std::io;

/// Errors that can occur during injectscope operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No project selected in module registry: {registry}")]
    NoProject { registry: String },

    #[error("Classpath error: {0}")]
    Classpath(String),

    #[error("Failed to start snippet process '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Snippet exited without writing a result")]
    MissingOutput,

    #[error("Malformed snippet output: {0}")]
    MalformedOutput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("A run is already in progress: {0}")]
    RunInProgress(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Module discovery error: {0}")]
    Discovery(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for injectscope operations
pub type Result<T> = std::result::Result<T, Error>;
