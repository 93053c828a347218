#![allow(dead_code)]

use bayes_core::NodeId;
use bayes_dag::distributions::Normal;
use bayes_dag::{DagGraph, Model, ModelBlueprint};

/// mu ~ Normal(0, 1), x ~ Normal(mu, 1) observed at 0.5.
pub struct Fixture {
    pub graph: DagGraph,
    pub model: Model,
    pub mu: NodeId,
    pub x: NodeId,
}

pub fn normal_model() -> Fixture {
    let mut graph = DagGraph::new();
    let zero = graph.add_constant("zero", 0.0);
    let one = graph.add_constant("one", 1.0);
    let mu = graph
        .add_stochastic("mu", Box::new(Normal), &[zero, one], 0.2)
        .unwrap();
    let x = graph
        .add_stochastic("x", Box::new(Normal), &[mu, one], 0.5)
        .unwrap();
    graph.clamp(x, 0.5).unwrap();
    graph.keep(x).unwrap();
    let model = Model::from_sources(&mut graph, &[x]).unwrap();
    let mu = model.clone_of(mu).unwrap();
    let x = model.clone_of(x).unwrap();
    graph.ln_probability(mu).unwrap();
    graph.ln_probability(x).unwrap();
    Fixture {
        graph,
        model,
        mu,
        x,
    }
}

pub const BLUEPRINT: &str = r#"
nodes:
  - {name: zero, kind: constant, value: 0.0}
  - {name: one, kind: constant, value: 1.0}
  - {name: offsets, kind: constant, value: [0.5, 1.5]}
  - {name: rate, kind: constant, value: 2.0}
  - {name: sigma, kind: stochastic, distribution: exponential, parents: [rate], value: 0.8}
  - {name: mu, kind: stochastic, distribution: normal, parents: [zero, one], value: 0.1}
  - {name: shifted, kind: deterministic, function: sum, parents: [mu, one], hidden: true}
  - {name: spare, kind: stochastic, distribution: normal, parents: [zero, one], value: 0.3}
  - {name: y, kind: stochastic, distribution: normal, parents: [mu, sigma], value: 0.7, clamped: true}
sources: [y, shifted, offsets, spare]
"#;

pub fn blueprint() -> ModelBlueprint {
    serde_yaml::from_str(BLUEPRINT).unwrap()
}
