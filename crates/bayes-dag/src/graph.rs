use std::collections::{BTreeMap, BTreeSet};

use bayes_core::errors::{BayesError, ErrorInfo};
use bayes_core::{NodeId, RngHandle, Value};
use tracing::debug;

use crate::distributions::Distribution;
use crate::functions::DeterministicFunction;
use crate::ids::{make_node, node_index};
use crate::node::{
    DeterministicState, NodeKind, NodeRecord, NodeStatus, NodeTag, Partition, StochasticState,
};

/// Arena holding every node of one or more DAGs.
///
/// Nodes are addressed by [`NodeId`]; slots are never reused, so a handle to a
/// destroyed node keeps failing with `unknown-node` instead of aliasing a new
/// node. Lifetime is governed by explicit reference counts: nodes created
/// through `add_*` start with one owner (the caller), each child holds one
/// reference per parent entry, and a node is destroyed synchronously when its
/// last owner releases it.
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    pub(crate) nodes: Vec<NodeRecord>,
}

impl DagGraph {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constant node owned by the caller.
    pub fn add_constant(&mut self, name: impl Into<String>, value: impl Into<Value>) -> NodeId {
        let id = self.push(NodeRecord::new(name.into(), value.into(), NodeKind::Constant));
        self.nodes[node_index(id)].ref_count = 1;
        id
    }

    /// Adds a stochastic node with the given parents, owned by the caller.
    ///
    /// The log probability is computed lazily on first request.
    pub fn add_stochastic(
        &mut self,
        name: impl Into<String>,
        distribution: Box<dyn Distribution>,
        parents: &[NodeId],
        value: impl Into<Value>,
    ) -> Result<NodeId, BayesError> {
        self.ensure_alive_all(parents)?;
        let kind = NodeKind::Stochastic(StochasticState {
            distribution,
            ln_prob: 0.0,
            needs_recalc: true,
            clamped: false,
        });
        let id = self.push(NodeRecord::new(name.into(), value.into(), kind));
        self.nodes[node_index(id)].ref_count = 1;
        for parent in parents {
            self.link(id, *parent)?;
        }
        Ok(id)
    }

    /// Adds a deterministic node with the given parents, owned by the caller.
    ///
    /// The value is computed lazily on first read.
    pub fn add_deterministic(
        &mut self,
        name: impl Into<String>,
        function: Box<dyn DeterministicFunction>,
        parents: &[NodeId],
    ) -> Result<NodeId, BayesError> {
        self.ensure_alive_all(parents)?;
        let kind = NodeKind::Deterministic(DeterministicState {
            function,
            needs_update: true,
        });
        let id = self.push(NodeRecord::new(name.into(), Value::default(), kind));
        self.nodes[node_index(id)].ref_count = 1;
        for parent in parents {
            self.link(id, *parent)?;
        }
        Ok(id)
    }

    /// Appends `parent` to the ordered parent list of `child`.
    ///
    /// Rejects self references and any edge that would close a directed cycle.
    pub fn add_parent(&mut self, child: NodeId, parent: NodeId) -> Result<(), BayesError> {
        self.node(parent)?;
        if matches!(self.node(child)?.kind, NodeKind::Constant) {
            return Err(graph_error("constant-parent", "constant nodes cannot have parents")
                .with_context("node", child));
        }
        if child == parent {
            return Err(graph_error("self-reference", "a node cannot be its own parent")
                .with_context("node", child));
        }
        if self.reaches(child, parent)? {
            return Err(graph_error(
                "would-create-cycle",
                "operation would introduce a directed cycle",
            )
            .with_context("child", child)
            .with_context("parent", parent));
        }
        self.link(child, parent)?;
        self.node_mut(child)?.kind.set_dirty(true);
        Ok(())
    }

    /// Removes one occurrence of `parent` from `child` and releases it.
    ///
    /// Returns the nodes destroyed by the release.
    pub fn remove_parent(
        &mut self,
        child: NodeId,
        parent: NodeId,
    ) -> Result<Vec<NodeId>, BayesError> {
        let record = self.node_mut(child)?;
        let position = record.parents.iter().position(|p| *p == parent).ok_or_else(|| {
            graph_error("unknown-edge", "node is not a parent of the child")
                .with_context("child", child)
                .with_context("parent", parent)
        })?;
        record.parents.remove(position);
        let still_parent = record.parents.contains(&parent);
        record.kind.set_dirty(true);
        if !still_parent {
            self.node_mut(parent)?.children.remove(&child);
        }
        self.release(parent)
    }

    /// Registers one more owner of `node` and returns the new count.
    pub fn acquire(&mut self, node: NodeId) -> Result<usize, BayesError> {
        let record = self.node_mut(node)?;
        record.ref_count += 1;
        Ok(record.ref_count)
    }

    /// Drops one owner of `node`.
    ///
    /// When the count reaches zero the node is destroyed, which in turn
    /// releases every parent reference it held. Returns every destroyed node in
    /// destruction order.
    pub fn release(&mut self, node: NodeId) -> Result<Vec<NodeId>, BayesError> {
        let mut destroyed = Vec::new();
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            let record = self.node_mut(current)?;
            if record.ref_count == 0 {
                return Err(graph_error(
                    "refcount-underflow",
                    "node released more often than it was acquired",
                )
                .with_context("node", current));
            }
            record.ref_count -= 1;
            if record.ref_count > 0 {
                continue;
            }
            record.alive = false;
            record.snapshot = None;
            let parents = std::mem::take(&mut record.parents);
            for parent in &parents {
                if let Some(parent_record) = self.nodes.get_mut(node_index(*parent)) {
                    parent_record.children.remove(&current);
                }
            }
            debug!(node = %current, parents = parents.len(), "destroyed node");
            destroyed.push(current);
            pending.extend(parents.into_iter().rev());
        }
        Ok(destroyed)
    }

    /// Returns whether the handle refers to a live node.
    pub fn is_alive(&self, node: NodeId) -> bool {
        self.nodes
            .get(node_index(node))
            .map(|record| record.alive)
            .unwrap_or(false)
    }

    /// Returns the identifiers of all live nodes in creation order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, record)| record.alive)
            .map(|(idx, _)| make_node(idx))
            .collect()
    }

    /// Number of live nodes.
    pub fn live_count(&self) -> usize {
        self.nodes.iter().filter(|record| record.alive).count()
    }

    /// Ordered parents of a node.
    pub fn parents(&self, node: NodeId) -> Result<&[NodeId], BayesError> {
        Ok(&self.node(node)?.parents)
    }

    /// Children of a node in identifier order.
    pub fn children(&self, node: NodeId) -> Result<&BTreeSet<NodeId>, BayesError> {
        Ok(&self.node(node)?.children)
    }

    /// Display name; empty when the node is anonymous.
    pub fn name(&self, node: NodeId) -> Result<&str, BayesError> {
        Ok(&self.node(node)?.name)
    }

    /// Name if set, otherwise the rendered identity.
    pub fn label(&self, node: NodeId) -> Result<String, BayesError> {
        let record = self.node(node)?;
        Ok(if record.name.is_empty() {
            node.to_string()
        } else {
            record.name.clone()
        })
    }

    /// Renames a node.
    pub fn set_name(&mut self, node: NodeId, name: impl Into<String>) -> Result<(), BayesError> {
        self.node_mut(node)?.name = name.into();
        Ok(())
    }

    /// Whether the node is hidden from summaries and traces.
    pub fn is_hidden(&self, node: NodeId) -> Result<bool, BayesError> {
        Ok(self.node(node)?.hidden)
    }

    /// Hides or reveals a node in summaries and traces.
    pub fn set_hidden(&mut self, node: NodeId, hidden: bool) -> Result<(), BayesError> {
        self.node_mut(node)?.hidden = hidden;
        Ok(())
    }

    /// Capability tag of a node.
    pub fn tag(&self, node: NodeId) -> Result<NodeTag, BayesError> {
        Ok(self.node(node)?.kind.tag())
    }

    /// Whether the node is constant.
    pub fn is_constant(&self, node: NodeId) -> Result<bool, BayesError> {
        Ok(self.tag(node)? == NodeTag::Constant)
    }

    /// Whether the node is stochastic.
    pub fn is_stochastic(&self, node: NodeId) -> Result<bool, BayesError> {
        Ok(self.tag(node)? == NodeTag::Stochastic)
    }

    /// Whether the node is deterministic.
    pub fn is_deterministic(&self, node: NodeId) -> Result<bool, BayesError> {
        Ok(self.tag(node)? == NodeTag::Deterministic)
    }

    /// Whether the node is an observed stochastic node.
    pub fn is_clamped(&self, node: NodeId) -> Result<bool, BayesError> {
        Ok(self.node(node)?.status().clamped)
    }

    /// Current number of owners.
    pub fn ref_count(&self, node: NodeId) -> Result<usize, BayesError> {
        Ok(self.node(node)?.ref_count)
    }

    /// Protocol state snapshot of a node.
    pub fn status(&self, node: NodeId) -> Result<NodeStatus, BayesError> {
        Ok(self.node(node)?.status())
    }

    /// Name of the distribution or function attached to the node.
    pub fn operator_name(&self, node: NodeId) -> Result<Option<&'static str>, BayesError> {
        Ok(self.node(node)?.kind.operator())
    }

    /// Informs a node which partition it serves and how many exist.
    pub fn set_active_pid(
        &mut self,
        node: NodeId,
        active_pid: usize,
        num_processes: usize,
    ) -> Result<(), BayesError> {
        if num_processes == 0 || active_pid >= num_processes {
            return Err(graph_error("invalid-partition", "partition index out of range")
                .with_context("active_pid", active_pid)
                .with_context("num_processes", num_processes));
        }
        self.node_mut(node)?.partition = Partition {
            active_pid,
            num_processes,
        };
        Ok(())
    }

    /// Returns the stored value without recomputing stale deterministic nodes.
    pub fn peek_value(&self, node: NodeId) -> Result<&Value, BayesError> {
        Ok(&self.node(node)?.value)
    }

    /// Returns the current value, recomputing stale deterministic ancestors first.
    pub fn value(&mut self, node: NodeId) -> Result<&Value, BayesError> {
        self.refresh(node)?;
        Ok(&self.node(node)?.value)
    }

    /// Assigns a new value to a constant or stochastic node.
    ///
    /// The node is touched first, so the assignment can be rolled back with
    /// [`DagGraph::restore`] or committed with [`DagGraph::keep`].
    pub fn set_value(&mut self, node: NodeId, value: impl Into<Value>) -> Result<(), BayesError> {
        if self.is_deterministic(node)? {
            return Err(graph_error(
                "deterministic-assignment",
                "deterministic nodes derive their value from their parents",
            )
            .with_context("node", node));
        }
        self.touch(node)?;
        self.node_mut(node)?.value = value.into();
        Ok(())
    }

    /// Assigns an observed value to a stochastic node and marks it clamped.
    pub fn clamp(&mut self, node: NodeId, value: impl Into<Value>) -> Result<(), BayesError> {
        self.stochastic_mut(node)?.clamped = true;
        self.set_value(node, value)
    }

    /// Marks a stochastic node as unobserved again.
    pub fn unclamp(&mut self, node: NodeId) -> Result<(), BayesError> {
        self.stochastic_mut(node)?.clamped = false;
        Ok(())
    }

    /// Draws a new value for a stochastic node from its distribution.
    pub fn redraw(&mut self, node: NodeId, rng: &mut RngHandle) -> Result<(), BayesError> {
        let args = self.parent_values(node)?;
        let value = self.stochastic_mut(node)?.distribution.sample(&args, rng)?;
        self.set_value(node, value)
    }

    /// Log probability of a stochastic node given its parents; zero for other kinds.
    pub fn ln_probability(&mut self, node: NodeId) -> Result<f64, BayesError> {
        let needs = match &self.node(node)?.kind {
            NodeKind::Stochastic(state) => state.needs_recalc,
            _ => return Ok(0.0),
        };
        if needs {
            let args = self.parent_values(node)?;
            let record = self.node_mut(node)?;
            if let NodeKind::Stochastic(state) = &mut record.kind {
                state.ln_prob = state.distribution.ln_density(&record.value, &args)?;
                state.needs_recalc = false;
            }
        }
        Ok(self.node(node)?.kind.ln_prob())
    }

    /// Current log probability minus the one stored at touch time.
    ///
    /// Zero for untouched nodes and for non-stochastic nodes.
    pub fn ln_probability_ratio(&mut self, node: NodeId) -> Result<f64, BayesError> {
        let current = self.ln_probability(node)?;
        Ok(match &self.node(node)?.snapshot {
            Some(snapshot) if self.is_stochastic(node)? => current - snapshot.ln_prob,
            _ => 0.0,
        })
    }

    /// Stochastic nodes whose probability depends on `node` through
    /// deterministic intermediates only, in discovery order.
    pub fn affected_stochastic(&self, node: NodeId) -> Result<Vec<NodeId>, BayesError> {
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        let mut stack: Vec<NodeId> = self.node(node)?.children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let record = self.node(current)?;
            match record.kind.tag() {
                NodeTag::Stochastic => out.push(current),
                NodeTag::Deterministic => stack.extend(record.children.iter().rev().copied()),
                NodeTag::Constant => {}
            }
        }
        Ok(out)
    }

    /// Values of the parents of `node`, refreshed, in parent order.
    pub(crate) fn parent_values(&mut self, node: NodeId) -> Result<Vec<Value>, BayesError> {
        let parents = self.node(node)?.parents.clone();
        let mut args = Vec::with_capacity(parents.len());
        for parent in parents {
            args.push(self.value(parent)?.clone());
        }
        Ok(args)
    }

    /// Recomputes a stale deterministic node (and its stale ancestors).
    pub(crate) fn refresh(&mut self, node: NodeId) -> Result<(), BayesError> {
        let needs = match &self.node(node)?.kind {
            NodeKind::Deterministic(state) => state.needs_update,
            _ => return Ok(()),
        };
        if !needs {
            return Ok(());
        }
        let args = self.parent_values(node)?;
        let record = self.node_mut(node)?;
        if let NodeKind::Deterministic(state) = &mut record.kind {
            record.value = state.function.compute(&args)?;
            state.needs_update = false;
        }
        Ok(())
    }

    pub(crate) fn push(&mut self, record: NodeRecord) -> NodeId {
        let id = make_node(self.nodes.len());
        self.nodes.push(record);
        id
    }

    /// Wires `parent` into `child` without structural checks and acquires it.
    pub(crate) fn link(&mut self, child: NodeId, parent: NodeId) -> Result<(), BayesError> {
        self.node_mut(child)?.parents.push(parent);
        let parent_record = self.node_mut(parent)?;
        parent_record.children.insert(child);
        parent_record.ref_count += 1;
        Ok(())
    }

    /// Whether `target` is reachable from `from` along child edges.
    pub(crate) fn reaches(&self, from: NodeId, target: NodeId) -> Result<bool, BayesError> {
        let mut states: BTreeMap<NodeId, VisitState> = BTreeMap::new();
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            if current == target {
                return Ok(true);
            }
            if states.insert(current, VisitState::Visited).is_some() {
                continue;
            }
            stack.extend(self.node(current)?.children.iter().copied());
        }
        Ok(false)
    }

    /// Topological order of `root` and all its descendants, root first.
    pub(crate) fn wave(&self, root: NodeId) -> Result<Vec<NodeId>, BayesError> {
        let mut states: BTreeMap<NodeId, VisitState> = BTreeMap::new();
        let mut post = Vec::new();
        self.post_order(root, &mut states, &mut post)?;
        post.reverse();
        Ok(post)
    }

    fn post_order(
        &self,
        node: NodeId,
        states: &mut BTreeMap<NodeId, VisitState>,
        out: &mut Vec<NodeId>,
    ) -> Result<(), BayesError> {
        match states.get(&node).copied().unwrap_or(VisitState::NotVisited) {
            VisitState::Visiting => Err(graph_error(
                "cycle-detected",
                "child edges form a directed cycle",
            )
            .with_context("node", node)),
            VisitState::Visited => Ok(()),
            VisitState::NotVisited => {
                states.insert(node, VisitState::Visiting);
                let children: Vec<NodeId> = self.node(node)?.children.iter().copied().collect();
                for child in children {
                    self.post_order(child, states, out)?;
                }
                states.insert(node, VisitState::Visited);
                out.push(node);
                Ok(())
            }
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&NodeRecord, BayesError> {
        self.nodes
            .get(node_index(id))
            .filter(|record| record.alive)
            .ok_or_else(|| {
                graph_error("unknown-node", "node does not exist").with_context("node", id)
            })
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeRecord, BayesError> {
        self.nodes
            .get_mut(node_index(id))
            .filter(|record| record.alive)
            .ok_or_else(|| {
                graph_error("unknown-node", "node does not exist").with_context("node", id)
            })
    }

    fn stochastic_mut(&mut self, id: NodeId) -> Result<&mut StochasticState, BayesError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Stochastic(state) => Ok(state),
            _ => Err(graph_error("not-stochastic", "operation requires a stochastic node")
                .with_context("node", id)),
        }
    }

    fn ensure_alive_all(&self, nodes: &[NodeId]) -> Result<(), BayesError> {
        for node in nodes {
            self.node(*node)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    NotVisited,
    Visiting,
    Visited,
}

pub(crate) fn graph_error(code: impl Into<String>, message: impl Into<String>) -> BayesError {
    BayesError::Graph(ErrorInfo::new(code, message))
}
