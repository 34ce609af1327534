pub mod command_breakdown;
pub mod tree;

pub use command_breakdown::{format_command_breakdown, print_command_breakdown};
pub use tree::print_results;
