use super::{Action, ActionString, Node, Results};
use crate::{
    snippets::{Binding, CodeProblem, SnippetOutput, SnippetResult},
    utils::shorten,
};

/// Turns snippet results into a [`Results`] tree
pub struct ResultsBuilder {
    results: Results,
}

impl ResultsBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            results: Results::new(title),
        }
    }

    pub fn add_snippet_result(&mut self, heading: &str, result: &SnippetResult) -> &mut Self {
        let node = self.results.root_mut().add_child(Node::plain(heading));

        match &result.output {
            SnippetOutput::Module { name, valid, .. } => {
                let verdict = if *valid { "is valid" } else { "is invalid" };
                let mut text = ActionString::new();
                text.add_text_with_action(shorten(name), Action::goto_file(name.as_str()))
                    .add_text(verdict);
                node.add_child(Node::new(text));
            }
            SnippetOutput::Context { bindings, .. } => {
                for binding in bindings {
                    node.add_child(binding_node(binding));
                }
            }
        }

        if !result.problems.is_empty() {
            let problems = node.add_child(Node::plain("Problems"));
            for problem in &result.problems {
                problems.add_child(problem_node(problem));
            }
        }
        self
    }

    /// Record a job that produced no result
    pub fn add_failure(&mut self, heading: &str, message: &str) -> &mut Self {
        self.results
            .root_mut()
            .add_child(Node::plain(heading))
            .add_child(Node::plain(format!("failed: {message}")));
        self
    }

    pub fn build(self) -> Results {
        self.results
    }
}

fn binding_node(binding: &Binding) -> Node {
    let mut text = ActionString::new();
    text.add_text_with_action(shorten(&binding.key), Action::goto_file(binding.key.as_str()));

    match &binding.target {
        Some(target) => {
            let action = match &binding.location {
                Some(location) => Action::goto_location(location.file.as_str(), location.line),
                None => Action::goto_file(target.as_str()),
            };
            text.add_text("is bound to")
                .add_text_with_action(shorten(target), action);
        }
        None => {
            text.add_text("is not bound");
        }
    }
    Node::new(text)
}

fn problem_node(problem: &CodeProblem) -> Node {
    match &problem.location {
        Some(location) => Node::with_action(
            problem.message.as_str(),
            Action::goto_location(location.file.as_str(), location.line),
        ),
        None => Node::plain(problem.message.as_str()),
    }
}
