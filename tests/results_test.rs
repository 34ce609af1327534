//! Result tree construction and comparison

use injectscope::results::{Action, ActionString, Node, Results, ResultsBuilder};
use injectscope::snippets::{Binding, SnippetResult};

fn bindings_tree(target: &str) -> Results {
    let mut results = Results::new("Bindings");
    let context = results.root_mut().add_child(Node::plain("Production"));
    let mut text = ActionString::new();
    text.add_text_with_action("Service", Action::goto_file("a.Service"))
        .add_text("is bound to")
        .add_element(target, Action::goto_location("AppModule.java", 12), Some("a.ServiceImpl".into()));
    context.add_child(Node::new(text));
    results
}

#[test]
fn test_identical_construction_compares_equal() {
    assert_eq!(bindings_tree("ServiceImpl"), bindings_tree("ServiceImpl"));
    assert_eq!(
        bindings_tree("ServiceImpl").root().to_string(),
        bindings_tree("ServiceImpl").root().to_string()
    );
}

#[test]
fn test_changed_leaf_breaks_equality() {
    assert_ne!(bindings_tree("ServiceImpl"), bindings_tree("OtherImpl"));
}

#[test]
fn test_emptiness_tracks_root_children_only() {
    let mut results = Results::new("Bindings");
    assert!(results.is_empty());

    let child = results.root_mut().add_child(Node::plain("Production"));
    child.add_child(Node::plain("nested"));
    assert!(!results.is_empty());

    let mut only_title = Results::new("");
    assert!(only_title.is_empty());
    only_title.root_mut().add_child(Node::default());
    assert!(!only_title.is_empty());
}

#[test]
fn test_builder_output_is_order_insensitive() {
    let service = Binding {
        key: "a.Service".into(),
        target: Some("a.ServiceImpl".into()),
        location: None,
    };
    let clock = Binding {
        key: "a.Clock".into(),
        target: None,
        location: None,
    };

    let mut forward = ResultsBuilder::new("Bindings");
    forward.add_snippet_result(
        "Production",
        &SnippetResult::context("Production", Vec::new(), vec![service.clone(), clock.clone()]),
    );
    let mut backward = ResultsBuilder::new("Bindings");
    backward.add_snippet_result(
        "Production",
        &SnippetResult::context("Production", Vec::new(), vec![clock, service]),
    );

    let forward = forward.build();
    let backward = backward.build();
    assert_eq!(forward, backward);
    assert_ne!(forward.render(), backward.render());
}
