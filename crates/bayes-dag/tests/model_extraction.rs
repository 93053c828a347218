mod common;

use std::collections::BTreeSet;

use bayes_dag::distributions::Normal;
use bayes_dag::functions::Exp;
use bayes_dag::{canonical_hash, DagGraph, Model, NodeTag};
use proptest::prelude::*;

use common::{chain, random_dag, stochastic_ancestors};

#[test]
fn source_with_two_parents_and_a_child_yields_four_clones() {
    let mut c = chain();
    let model = Model::from_sources(&mut c.graph, &[c.b]).unwrap();

    assert_eq!(model.dag_nodes().len(), 4);
    assert_eq!(model.sources(), &[c.b]);
    for original in [c.a, c.sd, c.b, c.c] {
        let copy = model.clone_of(original).unwrap();
        assert_ne!(copy, original);
        assert_eq!(c.graph.name(copy).unwrap(), c.graph.name(original).unwrap());
    }
    let b_copy = model.clone_of(c.b).unwrap();
    assert_eq!(
        c.graph.parents(b_copy).unwrap(),
        &[model.clone_of(c.a).unwrap(), model.clone_of(c.sd).unwrap()]
    );
    assert_eq!(model.ordered_stochastic_nodes(&c.graph).unwrap(), vec![b_copy]);
    // caller, child c and the model each hold the source
    assert_eq!(c.graph.ref_count(c.b).unwrap(), 3);
}

#[test]
fn invalid_source_is_rejected() {
    let mut c = chain();
    c.graph.release(c.c).unwrap();
    let mut model = Model::new();
    let err = model.add_source_node(&mut c.graph, c.c).unwrap_err();
    assert_eq!(err.code(), "invalid-source");
    assert!(model.dag_nodes().is_empty());
}

#[test]
fn model_edits_do_not_leak_into_originals() {
    let mut c = chain();
    let model = Model::from_sources(&mut c.graph, &[c.b]).unwrap();
    let b_copy = model.clone_of(c.b).unwrap();
    c.graph.set_value(b_copy, 3.0).unwrap();
    c.graph.keep(b_copy).unwrap();

    assert_eq!(c.graph.peek_value(c.b).unwrap().as_real(), Some(0.5));
    let c_copy = model.clone_of(c.c).unwrap();
    let refreshed = c.graph.value(c_copy).unwrap().as_real().unwrap();
    assert!((refreshed - 3.0f64.exp()).abs() < 1e-12);
}

#[test]
fn release_destroys_exactly_the_clones() {
    let mut c = chain();
    let model = Model::from_sources(&mut c.graph, &[c.b, c.c]).unwrap();
    let clones: BTreeSet<_> = model.dag_nodes().iter().copied().collect();

    let destroyed: BTreeSet<_> = model.release(&mut c.graph).unwrap().into_iter().collect();
    assert_eq!(destroyed, clones);
    for original in [c.a, c.sd, c.b, c.c] {
        assert!(c.graph.is_alive(original));
    }
    assert_eq!(c.graph.ref_count(c.b).unwrap(), 2);
}

#[test]
fn duplicate_reextracts_from_the_sources() {
    let mut c = chain();
    let model = Model::from_sources(&mut c.graph, &[c.b]).unwrap();
    let copy = model.duplicate(&mut c.graph).unwrap();

    assert_eq!(copy.sources(), model.sources());
    assert_eq!(copy.dag_nodes().len(), model.dag_nodes().len());
    let shared: BTreeSet<_> = model.dag_nodes().iter().collect();
    assert!(copy.dag_nodes().iter().all(|node| !shared.contains(node)));
    assert_eq!(
        canonical_hash(&c.graph, model.dag_nodes()).unwrap(),
        canonical_hash(&c.graph, copy.dag_nodes()).unwrap()
    );

    let mut target = Model::from_sources(&mut c.graph, &[c.c]).unwrap();
    target.assign_from(&mut c.graph, &model).unwrap();
    assert_eq!(target.sources(), model.sources());
    assert_eq!(target.dag_nodes().len(), 4);
}

#[test]
fn replica_holds_its_own_references() {
    let mut c = chain();
    let model = Model::from_sources(&mut c.graph, &[c.b, c.c]).unwrap();
    let clones: BTreeSet<_> = model.dag_nodes().iter().copied().collect();
    let (mut replica_graph, replica) = model.replicate(&c.graph);

    assert_eq!(replica, model);
    for node in model.dag_nodes().iter().chain(model.sources()) {
        assert_eq!(
            replica_graph.ref_count(*node).unwrap(),
            c.graph.ref_count(*node).unwrap()
        );
    }

    model.release(&mut c.graph).unwrap();
    for node in &clones {
        assert!(!c.graph.is_alive(*node));
        assert!(replica_graph.is_alive(*node));
    }

    let destroyed: BTreeSet<_> = replica.release(&mut replica_graph).unwrap().into_iter().collect();
    assert_eq!(destroyed, clones);
    assert_eq!(replica_graph.ref_count(c.b).unwrap(), 2);
}

#[test]
fn summary_lists_visible_vertices() {
    let mut graph = DagGraph::new();
    let mean = graph.add_constant("mean", 0.0);
    let sd = graph.add_constant("", 1.0);
    let x = graph.add_stochastic("x", Box::new(Normal), &[mean, sd], 0.25).unwrap();
    let y = graph.add_deterministic("y", Box::new(Exp), &[x]).unwrap();
    graph.set_hidden(y, true).unwrap();
    let model = Model::from_sources(&mut graph, &[x]).unwrap();

    let text = model.summary(&graph).to_string();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("Model with 3 vertices"));
    assert!(lines.next().unwrap().starts_with("-----"));
    assert!(text.contains("   Type         = Stochastic"));
    assert!(text.contains("   Distribution = normal"));
    assert!(!text.contains("Function"));
    assert!(text.contains("   Parents      = none"));
    let sd_copy = model.clone_of(sd).unwrap();
    assert!(text.contains(&sd_copy.to_string()));
}

#[test]
fn active_pid_reaches_every_clone() {
    let mut c = chain();
    let model = Model::from_sources(&mut c.graph, &[c.b]).unwrap();
    model.set_active_pid(&mut c.graph, 1, 4).unwrap();
    for node in model.dag_nodes() {
        let partition = c.graph.status(*node).unwrap().partition;
        assert_eq!((partition.active_pid, partition.num_processes), (1, 4));
    }
    assert_eq!(c.graph.status(c.b).unwrap().partition.num_processes, 1);
}

proptest! {
    #[test]
    fn stochastic_ancestors_are_ordered_first(
        recipe in prop::collection::vec((any::<u8>(), prop::collection::vec(any::<usize>(), 0..3)), 1..16),
        pick in any::<usize>(),
    ) {
        let (mut graph, ids) = random_dag(&recipe);
        let model = Model::from_sources(&mut graph, &[ids[pick % ids.len()]]).unwrap();
        let ordered = model.ordered_stochastic_nodes(&graph).unwrap();

        let expected: BTreeSet<_> = model
            .dag_nodes()
            .iter()
            .copied()
            .filter(|node| graph.tag(*node).unwrap() == NodeTag::Stochastic)
            .collect();
        prop_assert_eq!(ordered.iter().copied().collect::<BTreeSet<_>>(), expected);
        prop_assert_eq!(ordered.len(), ordered.iter().collect::<BTreeSet<_>>().len());

        for (position, node) in ordered.iter().enumerate() {
            for ancestor in stochastic_ancestors(&graph, *node) {
                let before = ordered.iter().position(|n| *n == ancestor).unwrap();
                prop_assert!(before < position);
            }
        }
    }
}
