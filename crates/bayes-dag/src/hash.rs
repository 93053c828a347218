use std::collections::BTreeMap;

use bayes_core::errors::BayesError;
use bayes_core::{NodeId, Value};
use sha2::{Digest, Sha256};

use crate::graph::DagGraph;
use crate::node::NodeTag;

/// Computes a structural hash of the listed nodes.
///
/// Parents are encoded by their position in `nodes` (or as external), so two
/// isomorphic graphs listed in corresponding order hash identically regardless
/// of where they live in the arena.
pub fn canonical_hash(graph: &DagGraph, nodes: &[NodeId]) -> Result<String, BayesError> {
    let positions: BTreeMap<NodeId, usize> = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (*node, idx))
        .collect();
    let mut hasher = Sha256::new();
    hasher.update((nodes.len() as u64).to_le_bytes());
    for node in nodes {
        let tag = graph.tag(*node)?;
        hasher.update([match tag {
            NodeTag::Constant => 0u8,
            NodeTag::Stochastic => 1,
            NodeTag::Deterministic => 2,
        }]);
        update_str(graph.name(*node)?, &mut hasher);
        update_str(graph.operator_name(*node)?.unwrap_or("-"), &mut hasher);
        hasher.update([u8::from(graph.is_clamped(*node)?)]);
        encode_value(graph.peek_value(*node)?, &mut hasher);
        let parents = graph.parents(*node)?;
        hasher.update((parents.len() as u64).to_le_bytes());
        for parent in parents {
            match positions.get(parent) {
                Some(position) => hasher.update((*position as u64).to_le_bytes()),
                None => hasher.update(u64::MAX.to_le_bytes()),
            }
        }
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn encode_value(value: &Value, hasher: &mut Sha256) {
    match value {
        Value::Boolean(b) => {
            hasher.update(b"bool");
            hasher.update([u8::from(*b)]);
        }
        Value::Integer(i) => {
            hasher.update(b"int");
            hasher.update(i.to_le_bytes());
        }
        Value::Real(x) => {
            hasher.update(b"real");
            hasher.update(x.to_bits().to_le_bytes());
        }
        Value::RealVector(values) => {
            hasher.update(b"vec");
            hasher.update((values.len() as u64).to_le_bytes());
            for x in values {
                hasher.update(x.to_bits().to_le_bytes());
            }
        }
    }
}

fn update_str(text: &str, hasher: &mut Sha256) {
    hasher.update((text.len() as u64).to_le_bytes());
    hasher.update(text.as_bytes());
}
