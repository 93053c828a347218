mod common;

use std::collections::{BTreeMap, BTreeSet};

use bayes_dag::functions::Sum;
use bayes_dag::DagGraph;
use proptest::prelude::*;

use common::{chain, random_dag, Recipe};

#[test]
fn release_cascades_through_parents() {
    let mut c = chain();
    // caller owns every node; parents are additionally held by their children
    assert_eq!(c.graph.ref_count(c.a).unwrap(), 2);
    assert_eq!(c.graph.ref_count(c.c).unwrap(), 1);

    assert!(c.graph.release(c.a).unwrap().is_empty());
    assert!(c.graph.release(c.sd).unwrap().is_empty());
    assert!(c.graph.release(c.b).unwrap().is_empty());
    let destroyed = c.graph.release(c.c).unwrap();

    assert_eq!(destroyed, vec![c.c, c.b, c.a, c.sd]);
    assert_eq!(c.graph.live_count(), 0);
}

#[test]
fn shared_parent_survives_while_any_owner_holds_it() {
    let mut graph = DagGraph::new();
    let shared = graph.add_constant("shared", 1.0);
    let left = graph.add_deterministic("left", Box::new(Sum), &[shared]).unwrap();
    let right = graph.add_deterministic("right", Box::new(Sum), &[shared]).unwrap();
    graph.release(shared).unwrap();

    assert_eq!(graph.release(left).unwrap(), vec![left]);
    assert!(graph.is_alive(shared));
    assert!(!graph.children(shared).unwrap().contains(&left));

    assert_eq!(graph.release(right).unwrap(), vec![right, shared]);
    assert!(!graph.is_alive(shared));
}

#[test]
fn released_handles_become_unknown() {
    let mut graph = DagGraph::new();
    let a = graph.add_constant("a", 1.0);
    let b = graph.add_deterministic("b", Box::new(Sum), &[a]).unwrap();
    graph.release(b).unwrap();
    assert_eq!(graph.release(b).unwrap_err().code(), "unknown-node");
    assert_eq!(graph.ref_count(a).unwrap(), 1);
}

#[test]
fn releasing_an_unowned_node_is_an_underflow() {
    let mut graph = DagGraph::new();
    let a = graph.add_constant("a", 1.0);
    let mut clones = BTreeMap::new();
    let copy = graph.clone_dag(a, &mut clones).unwrap();
    assert_eq!(graph.ref_count(copy).unwrap(), 0);

    let err = graph.release(copy).unwrap_err();
    assert_eq!(err.code(), "refcount-underflow");
    assert!(graph.is_alive(copy));
}

proptest! {
    #[test]
    fn every_node_is_destroyed_exactly_once(recipe in prop::collection::vec(
        (any::<u8>(), prop::collection::vec(any::<usize>(), 0..3)), 1..12),
        order in any::<u64>())
    {
        let recipe: Recipe = recipe;
        let (mut graph, ids) = random_dag(&recipe);
        let mut owners = ids.clone();
        // rotate the release order so it is not always creation order
        let shift = (order as usize) % owners.len();
        owners.rotate_left(shift);

        let mut destroyed = Vec::new();
        for (step, node) in owners.iter().enumerate() {
            destroyed.extend(graph.release(*node).unwrap());
            for remaining in &owners[step + 1..] {
                prop_assert!(graph.is_alive(*remaining));
            }
        }
        let unique: BTreeSet<_> = destroyed.iter().copied().collect();
        prop_assert_eq!(unique.len(), destroyed.len());
        prop_assert_eq!(unique.len(), ids.len());
        prop_assert_eq!(graph.live_count(), 0);
    }
}
