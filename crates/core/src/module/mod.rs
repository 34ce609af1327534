//! Known modules and module contexts, tracked per project

mod discovery;
mod registry;
mod types;

pub use discovery::{ModuleDiscovery, StaticDiscovery};
pub use registry::ModuleRegistry;
pub use types::{ModuleContext, ModuleRepresentation};
