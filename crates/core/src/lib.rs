//! injectscope - out-of-process introspection of dependency-injection configurations
//!
//! This crate provides:
//! - A job runner that executes snippet processes one at a time and fans out their results
//! - A progress tracker with cooperative cancellation
//! - A per-project registry of modules and module contexts
//! - Annotated result trees for presenting what the snippets found
pub mod command;
pub mod config;
pub mod error;
pub mod inspect;
pub mod messenger;
pub mod module;
pub mod progress;
pub mod project;
pub mod results;
pub mod runner;
pub mod snippets;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{Error, Result};
pub use messenger::{Messenger, NullMessenger, TracingMessenger};
pub use project::{ClasspathProject, Project, ProjectId};

// Re-export main API components
pub use command::{LaunchSpec, LaunchSpecBuilder};
pub use config::Config;
pub use inspect::ContextInspector;
pub use module::{ModuleContext, ModuleDiscovery, ModuleRegistry, ModuleRepresentation};
pub use progress::{ProgressReporter, ProgressTracker, RunStatus};
pub use results::{Action, ActionsHandler, Node, Results};
pub use runner::{Job, JobId, JobRunner, RunEvent, RunListener, SnippetJob};
pub use snippets::SnippetResult;
