#![allow(dead_code)]

use bayes_core::errors::BayesError;
use bayes_core::{NodeId, RngHandle, Value};
use bayes_dag::distributions::Normal;
use bayes_dag::functions::{Exp, Sum};
use bayes_dag::{DagGraph, Distribution};

/// Normal centred on the sum of any number of parents, unit variance.
#[derive(Debug, Clone, Copy)]
pub struct CentredNormal;

impl Distribution for CentredNormal {
    fn name(&self) -> &'static str {
        "centred-normal"
    }

    fn ln_density(&self, value: &Value, parents: &[Value]) -> Result<f64, BayesError> {
        let mean: f64 = parents.iter().filter_map(Value::as_real).sum();
        let x = value.as_real().unwrap_or(0.0);
        Ok(-0.5 * (x - mean) * (x - mean))
    }

    fn sample(&self, parents: &[Value], rng: &mut RngHandle) -> Result<Value, BayesError> {
        let mean: f64 = parents.iter().filter_map(Value::as_real).sum();
        Ok(Value::Real(mean + rng.uniform01() - 0.5))
    }

    fn box_clone(&self) -> Box<dyn Distribution> {
        Box::new(*self)
    }
}

/// A -> B -> C with A constant, B stochastic and C deterministic.
pub struct Chain {
    pub graph: DagGraph,
    pub a: NodeId,
    pub sd: NodeId,
    pub b: NodeId,
    pub c: NodeId,
}

pub fn chain() -> Chain {
    let mut graph = DagGraph::new();
    let a = graph.add_constant("a", 1.0);
    let sd = graph.add_constant("sd", 2.0);
    let b = graph
        .add_stochastic("b", Box::new(Normal), &[a, sd], 0.5)
        .unwrap();
    let c = graph.add_deterministic("c", Box::new(Exp), &[b]).unwrap();
    graph.value(c).unwrap();
    graph.ln_probability(b).unwrap();
    Chain { graph, a, sd, b, c }
}

/// Node recipe used by the random DAG builders: (kind selector, parent picks).
pub type Recipe = Vec<(u8, Vec<usize>)>;

/// Builds a random DAG where node `i` only draws parents from `0..i`.
pub fn random_dag(recipe: &Recipe) -> (DagGraph, Vec<NodeId>) {
    let mut graph = DagGraph::new();
    let mut ids: Vec<NodeId> = Vec::new();
    for (idx, (kind, picks)) in recipe.iter().enumerate() {
        let mut parents: Vec<NodeId> = picks
            .iter()
            .filter(|_| idx > 0)
            .map(|pick| ids[pick % idx])
            .collect();
        parents.sort();
        parents.dedup();
        let name = format!("n{idx}");
        let id = match (kind % 3, parents.is_empty()) {
            (_, true) | (0, _) => graph.add_constant(name, idx as f64),
            (1, false) => graph
                .add_stochastic(name, Box::new(CentredNormal), &parents, idx as f64 * 0.5)
                .unwrap(),
            _ => graph
                .add_deterministic(name, Box::new(Sum), &parents)
                .unwrap(),
        };
        ids.push(id);
    }
    (graph, ids)
}

/// Every stochastic ancestor of `node` (through any kind of node).
pub fn stochastic_ancestors(graph: &DagGraph, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = graph.parents(node).unwrap().to_vec();
    let mut seen = std::collections::BTreeSet::new();
    while let Some(current) = stack.pop() {
        if !seen.insert(current) {
            continue;
        }
        if graph.is_stochastic(current).unwrap() {
            out.push(current);
        }
        stack.extend(graph.parents(current).unwrap().iter().copied());
    }
    out
}
