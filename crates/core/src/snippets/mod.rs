//! The value a snippet process writes to its standard output

mod result;

pub use result::{Binding, CodeLocation, CodeProblem, ProblemKind, SnippetOutput, SnippetResult};
