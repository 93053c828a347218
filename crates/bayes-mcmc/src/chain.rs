use std::collections::BTreeSet;

use bayes_core::errors::{BayesError, ErrorInfo};
use bayes_core::{NodeId, RngHandle};
use bayes_dag::{DagGraph, Model};
use tracing::{debug, info, warn};

use crate::config::HeatConfig;
use crate::monitor::{TraceMonitor, TraceRow};
use crate::moves::Move;
use crate::schedule::{MoveSchedule, ScheduleKind};

/// Attempts at redrawing a starting state with a finite posterior.
const MAX_INITIAL_TRIES: usize = 100;

/// Single Metropolis-Hastings chain over one model.
///
/// The chain owns its graph; models and moves refer to nodes of that graph
/// by identity, so a chain replica copies the graph with the model's hold on
/// it and reuses the same handles.
#[derive(Debug)]
pub struct Mcmc {
    graph: DagGraph,
    model: Model,
    moves: Vec<Move>,
    schedule: MoveSchedule,
    rng: RngHandle,
    heat: f64,
    heats: HeatConfig,
    generation: u64,
    initialized: bool,
}

impl Clone for Mcmc {
    fn clone(&self) -> Self {
        let (graph, model) = self.model.replicate(&self.graph);
        Self {
            graph,
            model,
            moves: self.moves.clone(),
            schedule: self.schedule.clone(),
            rng: self.rng.clone(),
            heat: self.heat,
            heats: self.heats,
            generation: self.generation,
            initialized: self.initialized,
        }
    }
}

impl Mcmc {
    /// Creates a chain; every move must target nodes of `model`.
    pub fn new(
        graph: DagGraph,
        model: Model,
        moves: Vec<Move>,
        schedule: ScheduleKind,
        seed: u64,
    ) -> Result<Self, BayesError> {
        let owned: BTreeSet<NodeId> = model.dag_nodes().iter().copied().collect();
        for mv in &moves {
            if let Some(stray) = mv.nodes().find(|node| !owned.contains(node)) {
                return Err(BayesError::Sampler(
                    ErrorInfo::new("move-outside-model", "move targets a node the model does not hold")
                        .with_context("move", mv.name())
                        .with_context("node", stray),
                ));
            }
            if mv.is_gibbs() {
                // a prior redraw is only the full conditional when nothing stochastic depends on it
                for node in mv.nodes() {
                    if let Some(dependent) = graph.affected_stochastic(node)?.first() {
                        return Err(BayesError::Sampler(
                            ErrorInfo::new("gibbs-with-dependents", "gibbs redraw targets a node with stochastic dependents")
                                .with_context("move", mv.name())
                                .with_context("node", graph.label(node)?)
                                .with_context("dependent", graph.label(*dependent)?)
                                .with_hint("use a scale or sliding move for this node"),
                        ));
                    }
                }
            }
        }
        let schedule = MoveSchedule::new(schedule, &moves)?;
        Ok(Self {
            graph,
            model,
            moves,
            schedule,
            rng: RngHandle::from_seed(seed),
            heat: 1.0,
            heats: HeatConfig::default(),
            generation: 0,
            initialized: false,
        })
    }

    /// Replaces the likelihood and prior heats.
    pub fn with_heats(mut self, heats: HeatConfig) -> Self {
        self.heats = heats;
        self
    }

    /// Same chain driven by a fresh RNG.
    pub fn reseeded(mut self, seed: u64) -> Self {
        self.rng = RngHandle::from_seed(seed);
        self
    }

    /// Chain heat applied to the whole posterior.
    pub fn heat(&self) -> f64 {
        self.heat
    }

    /// Sets the chain heat; used by the tempered driver when heats are swapped.
    pub fn set_heat(&mut self, heat: f64) {
        self.heat = heat;
    }

    /// Graph replica owned by the chain.
    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    /// Mutable graph access for callers that inspect lazily refreshed values.
    pub fn graph_mut(&mut self) -> &mut DagGraph {
        &mut self.graph
    }

    /// Model sampled by the chain.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Registered moves in schedule order.
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Sampling generations completed; burn-in does not advance it.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Informs every model node of the partition this chain serves.
    pub fn set_active_pid(&mut self, active_pid: usize, num_processes: usize) -> Result<(), BayesError> {
        self.model
            .set_active_pid(&mut self.graph, active_pid, num_processes)
    }

    /// Brings every node up to date and commits a starting state.
    ///
    /// While the posterior is not finite, unclamped stochastic nodes are
    /// redrawn in topological order.
    pub fn initialize(&mut self) -> Result<(), BayesError> {
        let nodes = self.model.dag_nodes().to_vec();
        let ordered = self.model.ordered_stochastic_nodes(&self.graph)?;
        let mut tries = 0;
        loop {
            for node in &nodes {
                self.graph.touch(*node)?;
            }
            let ln_posterior = self.model.ln_probability(&mut self.graph)?;
            if ln_posterior.is_finite() {
                break;
            }
            tries += 1;
            if tries >= MAX_INITIAL_TRIES {
                return Err(BayesError::Sampler(
                    ErrorInfo::new("non-finite-start", "could not find a starting state with finite posterior")
                        .with_context("tries", tries),
                ));
            }
            warn!(tries, ln_posterior, "redrawing starting values");
            for node in &ordered {
                if !self.graph.is_clamped(*node)? {
                    self.graph.redraw(*node, &mut self.rng)?;
                }
            }
        }
        for node in &nodes {
            self.graph.keep(*node)?;
        }
        self.initialized = true;
        debug!(nodes = nodes.len(), tries, "chain initialized");
        Ok(())
    }

    /// Runs one generation of scheduled moves; returns how many were accepted.
    pub fn next_cycle(&mut self) -> Result<usize, BayesError> {
        self.initialize_if_needed()?;
        let plan = self.schedule.plan(&mut self.rng);
        let mut accepted = 0;
        for idx in plan {
            let mv = &mut self.moves[idx];
            if mv.perform_mcmc_step(
                &mut self.graph,
                &mut self.rng,
                self.heat,
                self.heats.likelihood,
                self.heats.prior,
            )? {
                accepted += 1;
            }
        }
        Ok(accepted)
    }

    /// One burn-in generation; tunes when `step` hits the interval.
    pub fn burnin_step(&mut self, step: usize, tuning_interval: usize) -> Result<(), BayesError> {
        self.next_cycle()?;
        if tuning_interval > 0 && step % tuning_interval == 0 {
            self.tune()?;
        }
        Ok(())
    }

    /// Runs `generations` burn-in generations, tuning every
    /// `tuning_interval`, then resets the move counters.
    pub fn burnin(&mut self, generations: usize, tuning_interval: usize) -> Result<(), BayesError> {
        for step in 1..=generations {
            self.burnin_step(step, tuning_interval)?;
        }
        self.reset_counters();
        info!(generations, "burn-in finished");
        Ok(())
    }

    /// Samples `generations` generations, writing a row to `monitor` at
    /// generation zero and every `thinning` generations.
    pub fn run(
        &mut self,
        generations: usize,
        thinning: usize,
        mut monitor: Option<&mut TraceMonitor>,
    ) -> Result<(), BayesError> {
        self.initialize_if_needed()?;
        if self.generation == 0 {
            if let Some(monitor) = monitor.as_deref_mut() {
                self.record(monitor)?;
            }
        }
        for _ in 0..generations {
            self.advance()?;
            if thinning > 0 && self.generation % thinning as u64 == 0 {
                if let Some(monitor) = monitor.as_deref_mut() {
                    self.record(monitor)?;
                }
            }
        }
        if let Some(monitor) = monitor {
            monitor.flush()?;
        }
        info!(generations, total = self.generation, "sampling finished");
        Ok(())
    }

    /// One sampling generation.
    pub fn advance(&mut self) -> Result<usize, BayesError> {
        let accepted = self.next_cycle()?;
        self.generation += 1;
        Ok(accepted)
    }

    /// Writes the current state as one trace row.
    pub fn record(&mut self, monitor: &mut TraceMonitor) -> Result<(), BayesError> {
        let likelihood = self.ln_likelihood()?;
        let prior = self.ln_prior()?;
        let row = TraceRow {
            generation: self.generation,
            posterior: likelihood + prior,
            likelihood,
            prior,
        };
        monitor.write_row(row, &mut self.graph)
    }

    /// Auto-tunes every move.
    pub fn tune(&mut self) -> Result<(), BayesError> {
        for mv in &mut self.moves {
            mv.auto_tune()?;
        }
        Ok(())
    }

    /// Clears the counters of every move.
    pub fn reset_counters(&mut self) {
        for mv in &mut self.moves {
            mv.reset_counters();
        }
    }

    /// Log posterior: likelihood plus prior, without heats.
    pub fn ln_posterior(&mut self) -> Result<f64, BayesError> {
        self.model.ln_probability(&mut self.graph)
    }

    /// Sum over clamped stochastic nodes.
    pub fn ln_likelihood(&mut self) -> Result<f64, BayesError> {
        self.sum_ln_probability(true)
    }

    /// Sum over unclamped stochastic nodes.
    pub fn ln_prior(&mut self) -> Result<f64, BayesError> {
        self.sum_ln_probability(false)
    }

    /// Header plus one line per move.
    pub fn move_summary(&self) -> String {
        let mut out = Move::summary_header();
        out.push('\n');
        for mv in &self.moves {
            out.push_str(&mv.summary_line(&self.graph));
            out.push('\n');
        }
        out
    }

    fn sum_ln_probability(&mut self, clamped: bool) -> Result<f64, BayesError> {
        let mut total = 0.0;
        for node in self.model.dag_nodes() {
            if self.graph.is_stochastic(*node)? && self.graph.is_clamped(*node)? == clamped {
                total += self.graph.ln_probability(*node)?;
            }
        }
        Ok(total)
    }

    /// Initializes the chain unless that already happened.
    pub fn initialize_if_needed(&mut self) -> Result<(), BayesError> {
        if !self.initialized {
            self.initialize()?;
        }
        Ok(())
    }
}
