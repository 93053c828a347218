use std::fmt;

use bayes_core::errors::{BayesError, ErrorInfo};
use bayes_core::{NodeId, RngHandle};
use bayes_dag::DagGraph;
use indexmap::IndexSet;
use tracing::{debug, warn};

use crate::proposal::Proposal;

/// Log acceptance ratios below this are rejected without drawing.
const MIN_LN_RATIO: f64 = -300.0;

/// Where a move is inside one proposal cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveState {
    /// No proposal outstanding.
    Idle,
    /// A proposal has been applied and awaits accept or reject.
    Proposed,
}

/// MCMC operator bound to a set of nodes.
///
/// The move does not own its nodes; the model holding them is responsible
/// for their lifetime. Lifetime counters feed the summary, the tuning
/// counters cover the period since the last [`Move::auto_tune`].
#[derive(Debug, Clone)]
pub struct Move {
    name: String,
    proposal: Box<dyn Proposal>,
    nodes: IndexSet<NodeId>,
    weight: f64,
    auto_tune: bool,
    num_tried: u64,
    num_accepted: u64,
    tuning_tried: u64,
    tuning_accepted: u64,
    state: MoveState,
}

impl Move {
    /// Binds `proposal` to `nodes`. Duplicate nodes are bound once.
    pub fn new(
        proposal: Box<dyn Proposal>,
        nodes: &[NodeId],
        weight: f64,
        auto_tune: bool,
    ) -> Result<Self, BayesError> {
        if nodes.is_empty() {
            return Err(move_error("empty-node-set", "a move needs at least one node"));
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(move_error("invalid-weight", "move weight must be finite and non-negative")
                .with_context("weight", weight));
        }
        Ok(Self {
            name: proposal.name().to_string(),
            proposal,
            nodes: nodes.iter().copied().collect(),
            weight,
            auto_tune,
            num_tried: 0,
            num_accepted: 0,
            tuning_tried: 0,
            tuning_accepted: 0,
            state: MoveState::Idle,
        })
    }

    /// Overrides the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Display name; defaults to the proposal name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bound nodes in binding order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    /// Position in the propose/accept/reject cycle.
    pub fn state(&self) -> MoveState {
        self.state
    }

    /// Proposals made since construction or the last counter reset.
    pub fn num_tried(&self) -> u64 {
        self.num_tried
    }

    /// Accepted proposals since construction or the last counter reset.
    pub fn num_accepted(&self) -> u64 {
        self.num_accepted
    }

    /// Relative selection frequency within a schedule.
    pub fn update_weight(&self) -> f64 {
        self.weight
    }

    /// Whether the move bypasses the acceptance test.
    pub fn is_gibbs(&self) -> bool {
        self.proposal.is_gibbs()
    }

    /// The kernel driving this move.
    pub fn proposal(&self) -> &dyn Proposal {
        self.proposal.as_ref()
    }

    /// Accepted over tried since construction; `None` before the first trial.
    pub fn acceptance_ratio(&self) -> Option<f64> {
        ratio(self.num_accepted, self.num_tried)
    }

    /// Applies the proposal to every bound node and returns the summed log
    /// Hastings ratio. The nodes are left touched.
    ///
    /// If the kernel fails on any node, the nodes already proposed are
    /// restored and the move stays idle with its counters unchanged.
    pub fn propose(&mut self, graph: &mut DagGraph, rng: &mut RngHandle) -> Result<f64, BayesError> {
        self.expect_state(MoveState::Idle, "propose")?;
        let mut ln_hastings = 0.0;
        for (position, node) in self.nodes.iter().enumerate() {
            match self.proposal.propose(graph, *node, rng) {
                Ok(ln) => ln_hastings += ln,
                Err(err) => {
                    for done in self.nodes.iter().take(position) {
                        graph.restore(*done)?;
                    }
                    debug!(name = %self.name, node = %node, code = err.code(), "proposal rolled back");
                    return Err(err);
                }
            }
        }
        self.num_tried += 1;
        self.tuning_tried += 1;
        self.state = MoveState::Proposed;
        Ok(ln_hastings)
    }

    /// Commits the outstanding proposal.
    pub fn accept(&mut self, graph: &mut DagGraph) -> Result<(), BayesError> {
        self.expect_state(MoveState::Proposed, "accept")?;
        for node in &self.nodes {
            graph.keep(*node)?;
        }
        self.num_accepted += 1;
        self.tuning_accepted += 1;
        self.state = MoveState::Idle;
        Ok(())
    }

    /// Rolls the outstanding proposal back.
    pub fn reject(&mut self, graph: &mut DagGraph) -> Result<(), BayesError> {
        self.expect_state(MoveState::Proposed, "reject")?;
        for node in &self.nodes {
            graph.restore(*node)?;
        }
        self.state = MoveState::Idle;
        Ok(())
    }

    /// Proposes and accepts unconditionally.
    pub fn perform_gibbs(&mut self, graph: &mut DagGraph, rng: &mut RngHandle) -> Result<(), BayesError> {
        self.propose(graph, rng)?;
        self.accept(graph)
    }

    /// One Metropolis-Hastings step under the given heats; returns whether the
    /// proposal was accepted. Gibbs kernels skip the acceptance test.
    ///
    /// Likelihood and prior ratios are summed over the bound nodes and the
    /// stochastic nodes they affect; clamped nodes count as likelihood.
    pub fn perform_mcmc_step(
        &mut self,
        graph: &mut DagGraph,
        rng: &mut RngHandle,
        heat: f64,
        likelihood_heat: f64,
        prior_heat: f64,
    ) -> Result<bool, BayesError> {
        if self.is_gibbs() {
            self.perform_gibbs(graph, rng)?;
            return Ok(true);
        }
        let ln_hastings = self.propose(graph, rng)?;

        let mut affected: IndexSet<NodeId> = IndexSet::new();
        for node in &self.nodes {
            affected.insert(*node);
            affected.extend(graph.affected_stochastic(*node)?);
        }
        let mut ln_likelihood = 0.0;
        let mut ln_prior = 0.0;
        for node in &affected {
            let ratio = graph.ln_probability_ratio(*node)?;
            if graph.is_clamped(*node)? {
                ln_likelihood += ratio;
            } else {
                ln_prior += ratio;
            }
        }
        let ln_ratio =
            heat * (likelihood_heat * ln_likelihood + prior_heat * ln_prior) + ln_hastings;

        let accepted = if ln_ratio.is_nan() || ln_ratio == f64::INFINITY {
            warn!(name = %self.name, ln_ratio, "non-finite acceptance ratio rejected");
            false
        } else if ln_ratio >= 0.0 {
            true
        } else if ln_ratio < MIN_LN_RATIO {
            false
        } else {
            rng.uniform01() < ln_ratio.exp()
        };
        debug!(
            name = %self.name,
            ln_ratio,
            ln_likelihood,
            ln_prior,
            ln_hastings,
            accepted,
            "mcmc step"
        );
        if accepted {
            self.accept(graph)?;
        } else {
            self.reject(graph)?;
        }
        Ok(accepted)
    }

    /// Tunes the proposal from the acceptance rate since the last call and
    /// resets the tuning counters. No-op when disabled or nothing was tried.
    pub fn auto_tune(&mut self) -> Result<(), BayesError> {
        self.expect_state(MoveState::Idle, "auto-tune")?;
        if !self.auto_tune {
            return Ok(());
        }
        if let Some(rate) = ratio(self.tuning_accepted, self.tuning_tried) {
            self.proposal.tune(rate);
            debug!(
                name = %self.name,
                rate,
                parameter = %self.proposal.parameter_summary(),
                "auto-tuned"
            );
        }
        self.tuning_tried = 0;
        self.tuning_accepted = 0;
        Ok(())
    }

    /// Clears every counter, typically at the end of burn-in.
    pub fn reset_counters(&mut self) {
        self.num_tried = 0;
        self.num_accepted = 0;
        self.tuning_tried = 0;
        self.tuning_accepted = 0;
    }

    /// Retargets the move from `old` to `new`, keeping the binding position.
    pub fn swap_node(&mut self, old: NodeId, new: NodeId) -> Result<(), BayesError> {
        let Some(position) = self.nodes.get_index_of(&old) else {
            return Err(move_error("node-not-bound", "cannot swap a node the move does not hold")
                .with_context("move", &self.name)
                .with_context("node", old));
        };
        self.nodes = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| if idx == position { new } else { *node })
            .collect();
        Ok(())
    }

    /// Column header matching the [`fmt::Display`] summary line.
    pub fn summary_header() -> String {
        format!(
            "{:<40} {:<20} {:>6} {:>10} {:>10} {:>10} {}",
            "Name", "Param", "Weight", "Tried", "Accepted", "Ratio", "Parameters"
        )
    }

    fn expect_state(&self, expected: MoveState, operation: &str) -> Result<(), BayesError> {
        if self.state == expected {
            return Ok(());
        }
        Err(move_error("invalid-move-state", "operation not allowed in the current move state")
            .with_context("move", &self.name)
            .with_context("operation", operation)
            .with_context("state", format!("{:?}", self.state)))
    }
}

/// Summary line with the first bound node rendered by identity; see
/// [`Move::summary_line`] for the named form.
impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = self.nodes.first().map(|node| node.to_string()).unwrap_or_default();
        f.write_str(&self.render_line(&first))
    }
}

impl Move {
    /// One-line summary using the name of the first bound node.
    pub fn summary_line(&self, graph: &DagGraph) -> String {
        let first = self
            .nodes
            .first()
            .and_then(|node| graph.label(*node).ok())
            .unwrap_or_default();
        self.render_line(&first)
    }

    fn render_line(&self, node: &str) -> String {
        let ratio = self
            .acceptance_ratio()
            .map(|r| format!("{r:.4}"))
            .unwrap_or_else(|| "NaN".to_string());
        format!(
            "{:<40} {:<20} {:>6} {:>10} {:>10} {:>10} {}",
            self.name,
            node,
            self.weight,
            self.num_tried,
            self.num_accepted,
            ratio,
            self.proposal.parameter_summary()
        )
    }
}

fn ratio(accepted: u64, tried: u64) -> Option<f64> {
    (tried > 0).then(|| accepted as f64 / tried as f64)
}

fn move_error(code: &str, message: &str) -> BayesError {
    BayesError::Move(ErrorInfo::new(code, message))
}
