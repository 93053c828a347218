use bayes_core::errors::BayesError;
use bayes_dag::functions::{Negate, Sum};
use bayes_dag::DagGraph;

#[test]
fn add_parent_blocks_cycles() {
    let mut graph = DagGraph::new();
    let a = graph.add_constant("a", 1.0);
    let b = graph.add_deterministic("b", Box::new(Negate), &[a]).unwrap();
    let c = graph.add_deterministic("c", Box::new(Negate), &[b]).unwrap();
    let d = graph.add_deterministic("d", Box::new(Sum), &[c]).unwrap();

    let err = graph.add_parent(b, d).unwrap_err();
    assert!(matches!(err, BayesError::Graph(ref info) if info.code == "would-create-cycle"));
    assert_eq!(graph.parents(b).unwrap(), &[a]);
    assert!(!graph.children(d).unwrap().contains(&b));
}

#[test]
fn add_parent_rejects_self_reference_and_constant_children() {
    let mut graph = DagGraph::new();
    let a = graph.add_constant("a", 1.0);
    let b = graph.add_deterministic("b", Box::new(Sum), &[a]).unwrap();

    assert_eq!(graph.add_parent(b, b).unwrap_err().code(), "self-reference");
    assert_eq!(graph.add_parent(a, b).unwrap_err().code(), "constant-parent");
}

#[test]
fn parents_stay_ordered_and_edges_mirror() {
    let mut graph = DagGraph::new();
    let x = graph.add_constant("x", 2.0);
    let y = graph.add_constant("y", 3.0);
    let s = graph.add_deterministic("s", Box::new(Sum), &[y, x]).unwrap();
    graph.add_parent(s, x).unwrap();

    assert_eq!(graph.parents(s).unwrap(), &[y, x, x]);
    assert!(graph.children(x).unwrap().contains(&s));
    assert!(graph.children(y).unwrap().contains(&s));
    assert_eq!(graph.value(s).unwrap().as_real(), Some(7.0));
    // caller plus two parent entries
    assert_eq!(graph.ref_count(x).unwrap(), 3);
}

#[test]
fn remove_parent_keeps_child_link_while_duplicates_remain() {
    let mut graph = DagGraph::new();
    let x = graph.add_constant("x", 2.0);
    let s = graph.add_deterministic("s", Box::new(Sum), &[x, x]).unwrap();

    assert!(graph.remove_parent(s, x).unwrap().is_empty());
    assert!(graph.children(x).unwrap().contains(&s));
    assert_eq!(graph.value(s).unwrap().as_real(), Some(2.0));

    graph.remove_parent(s, x).unwrap();
    assert!(graph.children(x).unwrap().is_empty());
    assert_eq!(graph.ref_count(x).unwrap(), 1);
}

#[test]
fn unknown_nodes_are_reported() {
    let mut graph = DagGraph::new();
    let a = graph.add_constant("a", 1.0);
    graph.release(a).unwrap();
    let err = graph.peek_value(a).unwrap_err();
    assert_eq!(err.code(), "unknown-node");
    assert_eq!(err.info().context.get("node").map(String::as_str), Some("#0"));
}
