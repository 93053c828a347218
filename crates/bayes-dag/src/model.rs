use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use bayes_core::errors::{BayesError, ErrorInfo};
use bayes_core::NodeId;
use tracing::{debug, info};

use crate::graph::DagGraph;
use crate::node::NodeTag;

/// Owned, cloned snapshot of the DAG reachable from a set of source nodes.
///
/// The model holds one reference on each original source and one reference on
/// every cloned node. Handles are plain identifiers into a [`DagGraph`], so the
/// model must be released explicitly through [`Model::release`]; dropping it
/// without releasing leaves the clones alive in the arena. The type is not
/// `Clone`: a second handle set would need its own references, see
/// [`Model::duplicate`] and [`Model::replicate`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Model {
    sources: Vec<NodeId>,
    nodes: Vec<NodeId>,
    nodes_map: BTreeMap<NodeId, NodeId>,
}

impl Model {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a model from one or more source nodes.
    pub fn from_sources(graph: &mut DagGraph, sources: &[NodeId]) -> Result<Self, BayesError> {
        let mut model = Self::new();
        for source in sources {
            model.add_source_node(graph, *source)?;
        }
        Ok(model)
    }

    /// Clones the DAG reachable from `source` into the model.
    ///
    /// Originals already cloned by an earlier call are reused. The flat node
    /// list is rebuilt from the identity map afterwards: every node in the map
    /// is acquired before the previously held nodes are released, so nodes held
    /// only by the model survive the rebuild.
    pub fn add_source_node(&mut self, graph: &mut DagGraph, source: NodeId) -> Result<(), BayesError> {
        if !graph.is_alive(source) {
            return Err(BayesError::Model(
                ErrorInfo::new("invalid-source", "cannot instantiate a model from an invalid node")
                    .with_context("node", source),
            ));
        }
        graph.clone_dag(source, &mut self.nodes_map)?;
        if !self.sources.contains(&source) {
            graph.acquire(source)?;
            self.sources.push(source);
        }

        let rebuilt: Vec<NodeId> = self.nodes_map.values().copied().collect();
        for node in &rebuilt {
            graph.acquire(*node)?;
        }
        for node in std::mem::take(&mut self.nodes) {
            graph.release(node)?;
        }
        self.nodes = rebuilt;
        info!(
            source = %source,
            nodes = self.nodes.len(),
            sources = self.sources.len(),
            "model source added"
        );
        Ok(())
    }

    /// Original nodes the model was extracted from.
    pub fn sources(&self) -> &[NodeId] {
        &self.sources
    }

    /// Every cloned node held by the model.
    pub fn dag_nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Identity map from original nodes to their clones.
    pub fn nodes_map(&self) -> &BTreeMap<NodeId, NodeId> {
        &self.nodes_map
    }

    /// Clone of an original node, if it is part of the model.
    pub fn clone_of(&self, original: NodeId) -> Option<NodeId> {
        self.nodes_map.get(&original).copied()
    }

    /// Stochastic nodes ordered so that every stochastic ancestor precedes its
    /// descendants.
    ///
    /// Parents are visited before a node and children after it; constant nodes
    /// do not recurse into parents. A node is marked visited only once its
    /// parents have been visited, which keeps a node reached through one parent
    /// from being emitted before a second, not yet visited parent.
    pub fn ordered_stochastic_nodes(&self, graph: &DagGraph) -> Result<Vec<NodeId>, BayesError> {
        let mut visited = BTreeSet::new();
        let mut ordered = Vec::new();
        for node in &self.nodes {
            visit(graph, *node, &mut visited, &mut ordered)?;
        }
        Ok(ordered)
    }

    /// Sum of the log probabilities of every stochastic node in the model.
    pub fn ln_probability(&self, graph: &mut DagGraph) -> Result<f64, BayesError> {
        let mut total = 0.0;
        for node in &self.nodes {
            total += graph.ln_probability(*node)?;
        }
        Ok(total)
    }

    /// Informs every node of the model which partition it serves.
    pub fn set_active_pid(
        &self,
        graph: &mut DagGraph,
        active_pid: usize,
        num_processes: usize,
    ) -> Result<(), BayesError> {
        for node in &self.nodes {
            graph.set_active_pid(*node, active_pid, num_processes)?;
        }
        Ok(())
    }

    /// Releases every held clone and source; returns the destroyed nodes.
    pub fn release(mut self, graph: &mut DagGraph) -> Result<Vec<NodeId>, BayesError> {
        self.release_all(graph)
    }

    /// Re-extracts a fresh model from this model's original sources.
    ///
    /// If the original graph changed since construction the copy reflects the
    /// current originals, not this model's clones.
    pub fn duplicate(&self, graph: &mut DagGraph) -> Result<Model, BayesError> {
        Self::from_sources(graph, &self.sources)
    }

    /// Copies `graph` together with this model's hold on it.
    ///
    /// The copied arena keeps every reference count, including the ones this
    /// model owns, so the returned model holds the same handles in the copy
    /// and can be released there independently of `self`.
    pub fn replicate(&self, graph: &DagGraph) -> (DagGraph, Model) {
        let model = Model {
            sources: self.sources.clone(),
            nodes: self.nodes.clone(),
            nodes_map: self.nodes_map.clone(),
        };
        (graph.clone(), model)
    }

    /// Releases the current contents and re-extracts from `other`'s sources.
    pub fn assign_from(&mut self, graph: &mut DagGraph, other: &Model) -> Result<(), BayesError> {
        if self == other {
            return Ok(());
        }
        let sources = other.sources.clone();
        self.release_all(graph)?;
        for source in sources {
            self.add_source_node(graph, source)?;
        }
        Ok(())
    }

    /// Printable summary of the model's visible nodes.
    pub fn summary<'a>(&'a self, graph: &'a DagGraph) -> ModelSummary<'a> {
        ModelSummary { model: self, graph }
    }

    fn release_all(&mut self, graph: &mut DagGraph) -> Result<Vec<NodeId>, BayesError> {
        let mut destroyed = Vec::new();
        for node in std::mem::take(&mut self.nodes) {
            destroyed.extend(graph.release(node)?);
        }
        for source in std::mem::take(&mut self.sources) {
            destroyed.extend(graph.release(source)?);
        }
        self.nodes_map.clear();
        debug!(destroyed = destroyed.len(), "model released");
        Ok(destroyed)
    }
}

fn visit(
    graph: &DagGraph,
    node: NodeId,
    visited: &mut BTreeSet<NodeId>,
    ordered: &mut Vec<NodeId>,
) -> Result<(), BayesError> {
    if visited.contains(&node) {
        return Ok(());
    }
    let tag = graph.tag(node)?;
    if tag != NodeTag::Constant {
        for parent in graph.parents(node)?.to_vec() {
            visit(graph, parent, visited, ordered)?;
        }
    }
    if !visited.insert(node) {
        return Ok(());
    }
    if tag == NodeTag::Stochastic {
        ordered.push(node);
    }
    for child in graph.children(node)?.iter().copied().collect::<Vec<_>>() {
        visit(graph, child, visited, ordered)?;
    }
    Ok(())
}

/// Display adapter returned by [`Model::summary`].
pub struct ModelSummary<'a> {
    model: &'a Model,
    graph: &'a DagGraph,
}

impl fmt::Display for ModelSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible: Vec<NodeId> = self
            .model
            .nodes
            .iter()
            .copied()
            .filter(|node| matches!(self.graph.is_hidden(*node), Ok(false)))
            .collect();
        writeln!(f, "Model with {} vertices", visible.len())?;
        writeln!(f, "-------------------------------------")?;
        for (idx, node) in visible.iter().enumerate() {
            let label = self.graph.label(*node).map_err(|_| fmt::Error)?;
            let tag = self.graph.tag(*node).map_err(|_| fmt::Error)?;
            writeln!(f, "{:<18}{} ({})", format!("Vertex {}", idx + 1), label, node)?;
            writeln!(f, "   Type         = {}", tag.label())?;
            match (tag, self.graph.operator_name(*node).map_err(|_| fmt::Error)?) {
                (NodeTag::Stochastic, Some(name)) => writeln!(f, "   Distribution = {name}")?,
                (NodeTag::Deterministic, Some(name)) => writeln!(f, "   Function     = {name}")?,
                _ => {}
            }
            let value = self.graph.peek_value(*node).map_err(|_| fmt::Error)?;
            writeln!(f, "   Value        = {value}")?;
            let parents = self.graph.parents(*node).map_err(|_| fmt::Error)?;
            writeln!(f, "   Parents      = {}", self.labels(parents.iter().copied()))?;
            let children = self.graph.children(*node).map_err(|_| fmt::Error)?;
            writeln!(f, "   Children     = {}", self.labels(children.iter().copied()))?;
            writeln!(f)?;
        }
        Ok(())
    }
}

impl ModelSummary<'_> {
    fn labels(&self, nodes: impl Iterator<Item = NodeId>) -> String {
        let labels: Vec<String> = nodes
            .map(|node| self.graph.label(node).unwrap_or_else(|_| node.to_string()))
            .collect();
        if labels.is_empty() {
            "none".to_string()
        } else {
            labels.join(", ")
        }
    }
}
