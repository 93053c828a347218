use std::fs;
use std::path::PathBuf;

use bayes_core::errors::{BayesError, ErrorInfo};
use bayes_core::{NodeId, RngHandle};
use bayes_dag::{canonical_hash, BuiltModel, DagGraph, ModelBlueprint};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chain::Mcmc;
use crate::config::McmcConfig;
use crate::determinism;
use crate::manifest::{MoveReport, RunManifest};
use crate::monitor::{visible_nodes, TraceMonitor};
use crate::moves::Move;
use crate::tempering::{Mcmcmc, SwapStats};

/// Summary returned to callers after a run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Structural hash of the model before sampling.
    pub model_hash: String,
    /// Log posterior of the cold chain at the end of the run.
    pub final_posterior: f64,
    /// Heat of every chain at the end of the run.
    pub heats: Vec<f64>,
    /// Index of the cold chain at the end of the run.
    pub cold_chain: usize,
    /// Cold chain move reports.
    pub moves: Vec<MoveReport>,
    /// Heat swap bookkeeping.
    pub swaps: SwapStats,
    /// Rendered move table of every chain.
    pub move_table: String,
    /// Trace rows written, excluding the header.
    pub trace_rows: usize,
    /// Trace file, when a run directory was configured.
    pub trace_path: Option<PathBuf>,
    /// Manifest file, when a run directory was configured.
    pub manifest_path: Option<PathBuf>,
}

/// Builds the blueprint, burns in and samples according to `config`.
///
/// Artefacts are written only when `config.output.run_directory` is set.
pub fn run(config: &McmcConfig, blueprint: &ModelBlueprint) -> Result<RunSummary, BayesError> {
    config.validate()?;
    let master_seed = config.seed_policy.master_seed;
    let mut graph = DagGraph::new();
    let mut build_rng = RngHandle::from_seed(determinism::build_seed(master_seed));
    let built = blueprint.build(&mut graph, &mut build_rng)?;
    let moves = build_moves(config, &built)?;
    let model_hash = canonical_hash(&graph, built.model.dag_nodes())?;
    let layout = config.output.run_directory.clone();
    // chain replicas share handles with the built model
    let monitored = match &layout {
        Some(_) => Some(monitored_nodes(config, &built, &graph)?),
        None => None,
    };

    let base = Mcmc::new(
        graph,
        built.model,
        moves,
        config.schedule,
        determinism::chain_seed(master_seed, 0),
    )?
    .with_heats(config.heats);
    let mut sampler = Mcmcmc::new(base, &config.ladder, master_seed)?;
    sampler.initialize()?;
    sampler.burnin(config.burn_in, config.tuning_interval)?;

    let mut monitor = match (&layout, &monitored) {
        (Some(dir), Some(nodes)) => {
            fs::create_dir_all(dir).map_err(|err| BayesError::serde("run-mkdir", err, dir))?;
            let delimiter = config.output.delimiter as u8;
            Some(TraceMonitor::create(
                &dir.join(&config.output.trace_file),
                delimiter,
                sampler.cold_chain_mut().graph_mut(),
                nodes,
            )?)
        }
        _ => None,
    };
    sampler.run(config.generations, config.thinning, monitor.as_mut())?;

    let final_posterior = sampler.cold_chain_mut().ln_posterior()?;
    let cold = sampler.cold_chain();
    let moves: Vec<MoveReport> = cold
        .moves()
        .iter()
        .map(|mv| MoveReport::from_move(mv, cold.graph()))
        .collect();
    let move_table = sampler.move_summary();

    let mut manifest_path = None;
    if let Some(dir) = &layout {
        let summary_path = dir.join(&config.output.summary_file);
        fs::write(&summary_path, &move_table)
            .map_err(|err| BayesError::serde("summary-write", err, &summary_path))?;
        let manifest = RunManifest {
            schema: bayes_core::SchemaVersion::current(),
            config: config.clone(),
            master_seed,
            seed_label: config.seed_policy.label.clone(),
            model_hash: model_hash.clone(),
            final_heats: sampler.heats(),
            cold_chain: sampler.cold_index(),
            final_posterior,
            moves: moves.clone(),
            swaps: sampler.swap_stats(),
            trace_file: Some(config.output.trace_file.clone()),
            summary_file: Some(config.output.summary_file.clone()),
        };
        let path = dir.join(&config.output.manifest_file);
        manifest.write(&path)?;
        manifest_path = Some(path);
    }

    info!(
        generations = config.generations,
        chains = config.ladder.chains,
        final_posterior,
        "run complete"
    );
    Ok(RunSummary {
        model_hash,
        final_posterior,
        heats: sampler.heats(),
        cold_chain: sampler.cold_index(),
        moves,
        swaps: sampler.swap_stats(),
        move_table,
        trace_rows: monitor.as_ref().map(TraceMonitor::rows).unwrap_or(0),
        trace_path: monitor.as_ref().map(|m| m.path().to_path_buf()),
        manifest_path,
    })
}

/// Binds every configured move to the built model.
pub fn build_moves(config: &McmcConfig, built: &BuiltModel) -> Result<Vec<Move>, BayesError> {
    if config.moves.is_empty() {
        return Err(BayesError::Config(ErrorInfo::new(
            "no-moves",
            "the configuration registers no moves",
        )));
    }
    config.moves.iter().map(|spec| spec.build(built)).collect()
}

fn monitored_nodes(
    config: &McmcConfig,
    built: &BuiltModel,
    graph: &DagGraph,
) -> Result<Vec<NodeId>, BayesError> {
    match &config.output.monitored {
        Some(names) => names
            .iter()
            .map(|name| {
                built.model_node(name).ok_or_else(|| {
                    BayesError::Config(
                        ErrorInfo::new("unknown-monitor-target", "monitored node is not part of the model")
                            .with_context("node", name),
                    )
                })
            })
            .collect(),
        None => visible_nodes(graph, built.model.dag_nodes()),
    }
}
