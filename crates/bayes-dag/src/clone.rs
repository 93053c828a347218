use std::collections::BTreeMap;

use bayes_core::errors::BayesError;
use bayes_core::NodeId;
use tracing::debug;

use crate::graph::{graph_error, DagGraph};

impl DagGraph {
    /// Deep-copies the connected DAG reachable from `source`.
    ///
    /// `clones` maps original identities to their copies and is updated in
    /// place. Originals already present as keys are reused, which makes the
    /// operation idempotent for shared parents and for overlapping source sets.
    /// Each copy is wired to its copied parents in the original parent order.
    /// Copies start without owners apart from the parent references held by
    /// their copied children. The original graph is not modified.
    pub fn clone_dag(
        &mut self,
        source: NodeId,
        clones: &mut BTreeMap<NodeId, NodeId>,
    ) -> Result<NodeId, BayesError> {
        let before = clones.len();
        let copy = self.clone_node(source, clones)?;
        debug!(
            source = %source,
            copy = %copy,
            created = clones.len() - before,
            "cloned dag"
        );
        Ok(copy)
    }

    fn clone_node(
        &mut self,
        original: NodeId,
        clones: &mut BTreeMap<NodeId, NodeId>,
    ) -> Result<NodeId, BayesError> {
        if let Some(existing) = clones.get(&original) {
            return Ok(*existing);
        }
        let record = self.node(original)?;
        if record.parents.contains(&original) || record.children.contains(&original) {
            return Err(graph_error("self-reference", "node refers to itself")
                .with_context("node", original));
        }
        let parents = record.parents.clone();
        let children: Vec<NodeId> = record.children.iter().copied().collect();
        let shell = record.shell();
        let copy = self.push(shell);
        clones.insert(original, copy);

        for parent in parents {
            let parent_copy = self.clone_node(parent, clones)?;
            self.link(copy, parent_copy)?;
        }
        for child in children {
            self.clone_node(child, clones)?;
        }
        Ok(copy)
    }
}
