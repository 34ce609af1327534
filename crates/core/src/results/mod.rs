//! Annotated result trees for presenting snippet findings

mod action;
mod builder;
mod node;

pub use action::{Action, ActionsHandler, StackFrame};
pub use builder::ResultsBuilder;
pub use node::{ActionElement, ActionString, Node};

/// A titled result tree.
///
/// Built on one thread; callers serialize access while adding children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Results {
    root: Node,
}

impl Results {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            root: Node::plain(title),
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    /// Hosts show a "no results" message when this is true
    pub fn is_empty(&self) -> bool {
        !self.root.has_children()
    }

    /// Plain-text rendering, two spaces of indent per level
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.root.write_indented(&mut out, 0);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_iff_root_has_no_children() {
        let mut results = Results::new("Bindings");
        assert!(results.is_empty());

        results.root_mut().add_child(Node::plain("child"));
        assert!(!results.is_empty());
    }

    #[test]
    fn test_render() {
        let mut results = Results::new("Bindings");
        results
            .root_mut()
            .add_child(Node::plain("Production"))
            .add_child(Node::plain("Service is bound to ServiceImpl"));
        assert_eq!(
            results.render(),
            "Bindings\n  Production\n    Service is bound to ServiceImpl\n"
        );
    }
}
