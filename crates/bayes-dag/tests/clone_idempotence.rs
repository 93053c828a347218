mod common;

use std::collections::BTreeMap;

use bayes_dag::{canonical_hash, Model};
use proptest::prelude::*;

use common::{chain, random_dag};

#[test]
fn clone_reuses_entries_already_in_the_map() {
    let mut c = chain();
    let mut clones = BTreeMap::new();
    let b_copy = c.graph.clone_dag(c.b, &mut clones).unwrap();
    assert_eq!(clones.len(), 4);
    let live = c.graph.live_count();

    let again = c.graph.clone_dag(c.c, &mut clones).unwrap();
    assert_eq!(clones.len(), 4);
    assert_eq!(c.graph.live_count(), live);
    assert_eq!(again, clones[&c.c]);
    assert_eq!(c.graph.parents(again).unwrap(), &[b_copy]);
}

#[test]
fn clone_leaves_the_original_untouched() {
    let mut c = chain();
    let before = canonical_hash(&c.graph, &[c.a, c.sd, c.b, c.c]).unwrap();
    let refs: Vec<usize> = [c.a, c.sd, c.b, c.c]
        .iter()
        .map(|n| c.graph.ref_count(*n).unwrap())
        .collect();

    let mut clones = BTreeMap::new();
    c.graph.clone_dag(c.a, &mut clones).unwrap();

    assert_eq!(before, canonical_hash(&c.graph, &[c.a, c.sd, c.b, c.c]).unwrap());
    for (node, count) in [c.a, c.sd, c.b, c.c].iter().zip(refs) {
        assert_eq!(c.graph.ref_count(*node).unwrap(), count);
    }
}

#[test]
fn isolated_node_clones_to_isolated_node() {
    let mut graph = bayes_dag::DagGraph::new();
    let lonely = graph.add_constant("lonely", 4.0);
    let mut clones = BTreeMap::new();
    let copy = graph.clone_dag(lonely, &mut clones).unwrap();
    assert_ne!(copy, lonely);
    assert!(graph.parents(copy).unwrap().is_empty());
    assert!(graph.children(copy).unwrap().is_empty());
    assert_eq!(graph.ref_count(copy).unwrap(), 0);
}

proptest! {
    #[test]
    fn fresh_clones_are_isomorphic(
        recipe in prop::collection::vec((any::<u8>(), prop::collection::vec(any::<usize>(), 0..3)), 1..14),
        pick in any::<usize>(),
    ) {
        let (mut graph, ids) = random_dag(&recipe);
        let source = ids[pick % ids.len()];

        let mut first = BTreeMap::new();
        graph.clone_dag(source, &mut first).unwrap();
        let mut second = BTreeMap::new();
        graph.clone_dag(source, &mut second).unwrap();

        let originals: Vec<_> = first.keys().copied().collect();
        prop_assert_eq!(&originals, &second.keys().copied().collect::<Vec<_>>());
        let first_nodes: Vec<_> = first.values().copied().collect();
        let second_nodes: Vec<_> = second.values().copied().collect();
        let original_hash = canonical_hash(&graph, &originals).unwrap();
        prop_assert_eq!(&original_hash, &canonical_hash(&graph, &first_nodes).unwrap());
        prop_assert_eq!(&original_hash, &canonical_hash(&graph, &second_nodes).unwrap());
    }

    #[test]
    fn overlapping_sources_share_clones(
        recipe in prop::collection::vec((any::<u8>(), prop::collection::vec(any::<usize>(), 0..3)), 2..14),
        picks in (any::<usize>(), any::<usize>()),
    ) {
        let (mut graph, ids) = random_dag(&recipe);
        let a = ids[picks.0 % ids.len()];
        let b = ids[picks.1 % ids.len()];

        let mut model = Model::new();
        model.add_source_node(&mut graph, a).unwrap();
        let after_first = model.nodes_map().clone();
        model.add_source_node(&mut graph, b).unwrap();

        for (original, copy) in &after_first {
            prop_assert_eq!(model.clone_of(*original), Some(*copy));
        }
        let mut copies: Vec<_> = model.nodes_map().values().copied().collect();
        copies.sort();
        copies.dedup();
        prop_assert_eq!(copies.len(), model.dag_nodes().len());
        for node in model.dag_nodes() {
            // one reference from the model plus one per copied child edge
            let child_edges: usize = graph
                .children(*node)
                .unwrap()
                .iter()
                .map(|child| graph.parents(*child).unwrap().iter().filter(|p| *p == node).count())
                .sum();
            prop_assert_eq!(graph.ref_count(*node).unwrap(), 1 + child_edges);
        }
    }
}
