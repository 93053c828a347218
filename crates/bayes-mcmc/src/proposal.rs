use std::fmt;

use bayes_core::errors::{BayesError, ErrorInfo};
use bayes_core::{NodeId, RngHandle, Value};
use bayes_dag::DagGraph;

/// Acceptance rate the tuning rule steers towards.
pub const TARGET_ACCEPTANCE: f64 = 0.44;

/// Kernel that perturbs the value of a single node.
///
/// `propose` must change the value through [`DagGraph::set_value`] (or
/// [`DagGraph::redraw`]) so that the node and its descendants are touched, and
/// returns the log Hastings ratio of the proposal.
pub trait Proposal: fmt::Debug + Send {
    /// Name used in move summaries.
    fn name(&self) -> &'static str;

    /// Proposes a new value for `node`.
    fn propose(
        &mut self,
        graph: &mut DagGraph,
        node: NodeId,
        rng: &mut RngHandle,
    ) -> Result<f64, BayesError>;

    /// Adjusts the tuning parameter given the acceptance rate of the last period.
    fn tune(&mut self, _rate: f64) {}

    /// Whether the kernel samples from the full conditional and is always accepted.
    fn is_gibbs(&self) -> bool {
        false
    }

    /// Short rendering of the tuning parameter, e.g. `lambda = 1.0000`.
    fn parameter_summary(&self) -> String;

    /// Boxed copy, used when moves are replicated across chains.
    fn box_clone(&self) -> Box<dyn Proposal>;
}

impl Clone for Box<dyn Proposal> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Multiplies the value by `exp(lambda * (u - 0.5))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleProposal {
    lambda: f64,
}

impl ScaleProposal {
    /// Creates the kernel with the given tuning parameter.
    pub fn new(lambda: f64) -> Self {
        Self { lambda }
    }

    /// Current tuning parameter.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }
}

impl Proposal for ScaleProposal {
    fn name(&self) -> &'static str {
        "Scale"
    }

    fn propose(
        &mut self,
        graph: &mut DagGraph,
        node: NodeId,
        rng: &mut RngHandle,
    ) -> Result<f64, BayesError> {
        let factor = (self.lambda * (rng.uniform01() - 0.5)).exp();
        let (proposed, dimension) = map_components(graph.peek_value(node)?, node, |x| x * factor)?;
        graph.set_value(node, proposed)?;
        Ok(dimension as f64 * factor.ln())
    }

    fn tune(&mut self, rate: f64) {
        self.lambda = tuned(self.lambda, rate);
    }

    fn parameter_summary(&self) -> String {
        format!("lambda = {:.4}", self.lambda)
    }

    fn box_clone(&self) -> Box<dyn Proposal> {
        Box::new(*self)
    }
}

/// Adds a uniform offset from `[-delta/2, delta/2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlidingProposal {
    delta: f64,
}

impl SlidingProposal {
    /// Creates the kernel with the given window width.
    pub fn new(delta: f64) -> Self {
        Self { delta }
    }

    /// Current window width.
    pub fn delta(&self) -> f64 {
        self.delta
    }
}

impl Proposal for SlidingProposal {
    fn name(&self) -> &'static str {
        "Slide"
    }

    fn propose(
        &mut self,
        graph: &mut DagGraph,
        node: NodeId,
        rng: &mut RngHandle,
    ) -> Result<f64, BayesError> {
        let shift = self.delta * (rng.uniform01() - 0.5);
        let (proposed, _) = map_components(graph.peek_value(node)?, node, |x| x + shift)?;
        graph.set_value(node, proposed)?;
        Ok(0.0)
    }

    fn tune(&mut self, rate: f64) {
        self.delta = tuned(self.delta, rate);
    }

    fn parameter_summary(&self) -> String {
        format!("delta = {:.4}", self.delta)
    }

    fn box_clone(&self) -> Box<dyn Proposal> {
        Box::new(*self)
    }
}

/// Redraws the node from its distribution given the current parent values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GibbsRedraw;

impl Proposal for GibbsRedraw {
    fn name(&self) -> &'static str {
        "Gibbs"
    }

    fn propose(
        &mut self,
        graph: &mut DagGraph,
        node: NodeId,
        rng: &mut RngHandle,
    ) -> Result<f64, BayesError> {
        graph.redraw(node, rng)?;
        Ok(0.0)
    }

    fn is_gibbs(&self) -> bool {
        true
    }

    fn parameter_summary(&self) -> String {
        String::new()
    }

    fn box_clone(&self) -> Box<dyn Proposal> {
        Box::new(*self)
    }
}

/// Up/down tuning rule shared by the scale and sliding kernels.
pub fn tuned(parameter: f64, rate: f64) -> f64 {
    if rate > TARGET_ACCEPTANCE {
        parameter * (1.0 + (rate - TARGET_ACCEPTANCE) / (1.0 - TARGET_ACCEPTANCE))
    } else {
        parameter / (2.0 - rate / TARGET_ACCEPTANCE)
    }
}

fn map_components(
    value: &Value,
    node: NodeId,
    f: impl Fn(f64) -> f64,
) -> Result<(Value, usize), BayesError> {
    match value {
        Value::Real(x) => Ok((Value::Real(f(*x)), 1)),
        // integer literals in blueprints are promoted once they are perturbed
        Value::Integer(i) => Ok((Value::Real(f(*i as f64)), 1)),
        Value::RealVector(values) => Ok((
            Value::RealVector(values.iter().map(|x| f(*x)).collect()),
            values.len(),
        )),
        other => Err(BayesError::Move(
            ErrorInfo::new("unsupported-value", "proposal only perturbs numeric nodes")
                .with_context("node", node)
                .with_context("type", other.type_name()),
        )),
    }
}
