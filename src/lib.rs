//! injectscope - out-of-process introspection of dependency-injection configurations
//!
//! Re-exports [`injectscope_core`]; see that crate for the job runner, the
//! module registry and the result tree.
pub use injectscope_core::*;
