use std::collections::BTreeSet;

use bayes_core::{NodeId, Value};
use serde::{Deserialize, Serialize};

use crate::distributions::Distribution;
use crate::functions::DeterministicFunction;

/// Capability tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeTag {
    /// Fixed value with no parents.
    Constant,
    /// Random variable contributing to the log probability.
    Stochastic,
    /// Pure function of its parents.
    Deterministic,
}

impl NodeTag {
    /// Label used in model summaries.
    pub fn label(&self) -> &'static str {
        match self {
            NodeTag::Constant => "Constant",
            NodeTag::Stochastic => "Stochastic",
            NodeTag::Deterministic => "Deterministic",
        }
    }
}

/// Partition slot informing a node which replicate it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Index of the partition this node is responsible for.
    pub active_pid: usize,
    /// Total number of partitions.
    pub num_processes: usize,
}

impl Default for Partition {
    fn default() -> Self {
        Self {
            active_pid: 0,
            num_processes: 1,
        }
    }
}

/// Read-only view of a node's protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    /// Capability tag.
    pub tag: NodeTag,
    /// Whether the node is inside an open touch wave.
    pub touched: bool,
    /// Whether a lazily computed quantity (value or log probability) is stale.
    pub dirty: bool,
    /// Number of owners currently holding the node.
    pub ref_count: usize,
    /// Whether a stochastic node is observed.
    pub clamped: bool,
    /// Partition slot.
    pub partition: Partition,
}

/// Pre-touch state retained until the wave is kept or restored.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub(crate) value: Value,
    pub(crate) dirty: bool,
    pub(crate) ln_prob: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct StochasticState {
    pub(crate) distribution: Box<dyn Distribution>,
    pub(crate) ln_prob: f64,
    pub(crate) needs_recalc: bool,
    pub(crate) clamped: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct DeterministicState {
    pub(crate) function: Box<dyn DeterministicFunction>,
    pub(crate) needs_update: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Constant,
    Stochastic(StochasticState),
    Deterministic(DeterministicState),
}

impl NodeKind {
    pub(crate) fn tag(&self) -> NodeTag {
        match self {
            NodeKind::Constant => NodeTag::Constant,
            NodeKind::Stochastic(_) => NodeTag::Stochastic,
            NodeKind::Deterministic(_) => NodeTag::Deterministic,
        }
    }

    pub(crate) fn is_dirty(&self) -> bool {
        match self {
            NodeKind::Constant => false,
            NodeKind::Stochastic(state) => state.needs_recalc,
            NodeKind::Deterministic(state) => state.needs_update,
        }
    }

    pub(crate) fn set_dirty(&mut self, dirty: bool) {
        match self {
            NodeKind::Constant => {}
            NodeKind::Stochastic(state) => state.needs_recalc = dirty,
            NodeKind::Deterministic(state) => state.needs_update = dirty,
        }
    }

    pub(crate) fn ln_prob(&self) -> f64 {
        match self {
            NodeKind::Stochastic(state) => state.ln_prob,
            _ => 0.0,
        }
    }

    /// Name of the attached distribution or function, if any.
    pub(crate) fn operator(&self) -> Option<&'static str> {
        match self {
            NodeKind::Constant => None,
            NodeKind::Stochastic(state) => Some(state.distribution.name()),
            NodeKind::Deterministic(state) => Some(state.function.name()),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeRecord {
    pub(crate) alive: bool,
    pub(crate) name: String,
    pub(crate) hidden: bool,
    pub(crate) value: Value,
    pub(crate) touched: bool,
    pub(crate) snapshot: Option<Snapshot>,
    pub(crate) parents: Vec<NodeId>,
    pub(crate) children: BTreeSet<NodeId>,
    pub(crate) ref_count: usize,
    pub(crate) kind: NodeKind,
    pub(crate) partition: Partition,
}

impl NodeRecord {
    pub(crate) fn new(name: String, value: Value, kind: NodeKind) -> Self {
        Self {
            alive: true,
            name,
            hidden: false,
            value,
            touched: false,
            snapshot: None,
            parents: Vec::new(),
            children: BTreeSet::new(),
            ref_count: 0,
            kind,
            partition: Partition::default(),
        }
    }

    /// Copy of this record with fresh adjacency and no owners.
    pub(crate) fn shell(&self) -> Self {
        Self {
            alive: true,
            name: self.name.clone(),
            hidden: self.hidden,
            value: self.value.clone(),
            touched: self.touched,
            snapshot: self.snapshot.clone(),
            parents: Vec::new(),
            children: BTreeSet::new(),
            ref_count: 0,
            kind: self.kind.clone(),
            partition: self.partition,
        }
    }

    pub(crate) fn status(&self) -> NodeStatus {
        NodeStatus {
            tag: self.kind.tag(),
            touched: self.touched,
            dirty: self.kind.is_dirty(),
            ref_count: self.ref_count,
            clamped: matches!(&self.kind, NodeKind::Stochastic(state) if state.clamped),
            partition: self.partition,
        }
    }
}
