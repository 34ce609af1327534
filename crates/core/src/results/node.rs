use std::fmt;

use super::action::Action;

/// A run of text where each element may carry an action and a tooltip
#[derive(Debug, Clone, Default)]
pub struct ActionString {
    elements: Vec<ActionElement>,
}

#[derive(Debug, Clone)]
pub struct ActionElement {
    pub label: String,
    pub action: Action,
    pub tooltip: Option<String>,
}

impl ActionString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.add_element(text, Action::Null, None)
    }

    pub fn add_text_with_action(&mut self, text: impl Into<String>, action: Action) -> &mut Self {
        self.add_element(text, action, None)
    }

    pub fn add_element(
        &mut self,
        text: impl Into<String>,
        action: Action,
        tooltip: Option<String>,
    ) -> &mut Self {
        self.elements.push(ActionElement {
            label: text.into(),
            action,
            tooltip,
        });
        self
    }

    pub fn elements(&self) -> &[ActionElement] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

// Tooltips are presentation only.
impl PartialEq for ActionString {
    fn eq(&self, other: &Self) -> bool {
        self.elements.len() == other.elements.len()
            && self
                .elements
                .iter()
                .zip(&other.elements)
                .all(|(a, b)| a.label == b.label && a.action == b.action)
    }
}

impl Eq for ActionString {}

impl From<&str> for ActionString {
    fn from(text: &str) -> Self {
        let mut string = ActionString::new();
        string.add_text(text);
        string
    }
}

impl From<String> for ActionString {
    fn from(text: String) -> Self {
        let mut string = ActionString::new();
        string.add_text(text);
        string
    }
}

impl fmt::Display for ActionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&element.label)?;
        }
        Ok(())
    }
}

/// A result tree node.
///
/// Children keep insertion order and duplicates; equality compares them as
/// a multiset, so two trees built from the same findings in a different
/// order are equal.
#[derive(Debug, Clone, Default)]
pub struct Node {
    text: ActionString,
    children: Vec<Node>,
}

impl Node {
    pub fn new(text: ActionString) -> Self {
        Self {
            text,
            children: Vec::new(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(ActionString::from(text.into()))
    }

    pub fn with_action(text: impl Into<String>, action: Action) -> Self {
        let mut string = ActionString::new();
        string.add_text_with_action(text, action);
        Self::new(string)
    }

    /// Append `child` and return it for further building
    pub fn add_child(&mut self, child: Node) -> &mut Node {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn text(&self) -> &ActionString {
        &self.text
    }

    pub fn text_string(&self) -> String {
        self.text.to_string()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub(crate) fn write_indented(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(&self.text_string());
        out.push('\n');
        for child in &self.children {
            child.write_indented(out, depth + 1);
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        if self.text != other.text || self.children.len() != other.children.len() {
            return false;
        }
        let mut unmatched: Vec<&Node> = other.children.iter().collect();
        self.children.iter().all(|child| {
            match unmatched.iter().position(|candidate| *candidate == child) {
                Some(i) => {
                    unmatched.swap_remove(i);
                    true
                }
                None => false,
            }
        })
    }
}

impl Eq for Node {}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({}){{", self.text)?;
        for child in &self.children {
            write!(f, "{child},")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        let mut root = Node::plain("root");
        let binding = root.add_child(Node::with_action("Service", Action::goto_file("a.Service")));
        binding.add_child(Node::plain("is bound to"));
        root.add_child(Node::plain("other"));
        root
    }

    #[test]
    fn test_same_construction_is_equal() {
        assert_eq!(sample(), sample());
    }

    #[test]
    fn test_changing_a_leaf_breaks_equality() {
        let mut changed = Node::plain("root");
        let binding =
            changed.add_child(Node::with_action("Service", Action::goto_file("a.Service")));
        binding.add_child(Node::plain("is bound from"));
        changed.add_child(Node::plain("other"));
        assert_ne!(sample(), changed);
    }

    #[test]
    fn test_action_is_part_of_identity_but_tooltip_is_not() {
        let mut a = ActionString::new();
        a.add_element("x", Action::goto_file("a.X"), Some("tip".into()));
        let mut b = ActionString::new();
        b.add_text_with_action("x", Action::goto_file("a.X"));
        assert_eq!(Node::new(a), Node::new(b));

        assert_ne!(
            Node::with_action("x", Action::goto_file("a.X")),
            Node::plain("x")
        );
    }

    #[test]
    fn test_children_compare_as_multiset() {
        let mut a = Node::plain("root");
        a.add_child(Node::plain("one"));
        a.add_child(Node::plain("two"));
        a.add_child(Node::plain("two"));

        let mut b = Node::plain("root");
        b.add_child(Node::plain("two"));
        b.add_child(Node::plain("one"));
        b.add_child(Node::plain("two"));
        assert_eq!(a, b);

        let mut c = Node::plain("root");
        c.add_child(Node::plain("one"));
        c.add_child(Node::plain("one"));
        c.add_child(Node::plain("two"));
        assert_ne!(a, c);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut root = Node::plain("root");
        root.add_child(Node::plain("dup"));
        root.add_child(Node::plain("dup"));
        assert_eq!(root.children().len(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            sample().to_string(),
            "Node(root){Node(Service){Node(is bound to){},},Node(other){},}"
        );
    }
}
