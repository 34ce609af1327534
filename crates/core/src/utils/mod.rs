pub mod names;

pub use names::shorten;
