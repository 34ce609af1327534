pub mod launch_spec;

pub use launch_spec::{LaunchSpec, LaunchSpecBuilder, CLASSPATH_FLAG};
