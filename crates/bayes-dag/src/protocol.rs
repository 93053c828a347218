//! Touch / keep / restore broadcast.
//!
//! Every broadcast computes the wave once (the root plus all descendants in
//! topological order) and visits each member exactly once, so diamond-shaped
//! fan-in never triggers a second visit. Values of deterministic nodes are not
//! recomputed on touch; they are refreshed lazily on read or eagerly on keep.

use bayes_core::errors::BayesError;
use bayes_core::NodeId;
use tracing::trace;

use crate::graph::DagGraph;
use crate::node::{NodeKind, NodeTag, Snapshot};

impl DagGraph {
    /// Marks `node` and every descendant stale.
    ///
    /// On the first touch of a wave each member stores its current value,
    /// dirty flag and log probability so the wave can be restored exactly.
    /// Returns the number of nodes visited.
    pub fn touch(&mut self, node: NodeId) -> Result<usize, BayesError> {
        let wave = self.wave(node)?;
        for member in &wave {
            let record = self.node_mut(*member)?;
            if !record.touched {
                record.snapshot = Some(Snapshot {
                    value: record.value.clone(),
                    dirty: record.kind.is_dirty(),
                    ln_prob: record.kind.ln_prob(),
                });
                record.touched = true;
            }
            record.kind.set_dirty(true);
        }
        trace!(node = %node, visited = wave.len(), "touch");
        Ok(wave.len())
    }

    /// Commits the current values of `node` and its descendants.
    ///
    /// Stale deterministic values are recomputed and stochastic log
    /// probabilities are refreshed, parents first. Returns the number of nodes
    /// visited.
    pub fn keep(&mut self, node: NodeId) -> Result<usize, BayesError> {
        let wave = self.wave(node)?;
        for member in &wave {
            let tag = self.node(*member)?.kind.tag();
            match tag {
                NodeTag::Deterministic => self.refresh(*member)?,
                NodeTag::Stochastic => {
                    self.ln_probability(*member)?;
                }
                NodeTag::Constant => {}
            }
            let record = self.node_mut(*member)?;
            record.snapshot = None;
            record.touched = false;
        }
        trace!(node = %node, visited = wave.len(), "keep");
        Ok(wave.len())
    }

    /// Reinstates the pre-touch state of `node` and its descendants.
    ///
    /// Members that were never touched are left alone. Returns the number of
    /// nodes visited.
    pub fn restore(&mut self, node: NodeId) -> Result<usize, BayesError> {
        let wave = self.wave(node)?;
        for member in &wave {
            let record = self.node_mut(*member)?;
            if let Some(snapshot) = record.snapshot.take() {
                record.value = snapshot.value;
                record.kind.set_dirty(snapshot.dirty);
                if let NodeKind::Stochastic(state) = &mut record.kind {
                    state.ln_prob = snapshot.ln_prob;
                }
            }
            record.touched = false;
        }
        trace!(node = %node, visited = wave.len(), "restore");
        Ok(wave.len())
    }
}
