use std::fs;
use std::path::{Path, PathBuf};

use bayes_core::errors::BayesError;
use bayes_core::SchemaVersion;
use bayes_dag::DagGraph;
use serde::{Deserialize, Serialize};

use crate::config::McmcConfig;
use crate::moves::Move;
use crate::tempering::SwapStats;

/// Final bookkeeping of one move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveReport {
    /// Move name.
    pub name: String,
    /// Name (or identity) of the first bound node.
    pub node: String,
    /// Selection weight.
    pub weight: f64,
    /// Proposals made after burn-in.
    pub tried: u64,
    /// Accepted proposals after burn-in.
    pub accepted: u64,
    /// `accepted / tried`, absent when nothing was tried.
    pub ratio: Option<f64>,
    /// Rendered tuning parameter.
    pub parameters: String,
}

impl MoveReport {
    /// Captures the counters of `mv`.
    pub fn from_move(mv: &Move, graph: &DagGraph) -> Self {
        let node = mv
            .nodes()
            .next()
            .map(|node| graph.label(node).unwrap_or_else(|_| node.to_string()))
            .unwrap_or_default();
        Self {
            name: mv.name().to_string(),
            node,
            weight: mv.update_weight(),
            tried: mv.num_tried(),
            accepted: mv.num_accepted(),
            ratio: mv.acceptance_ratio(),
            parameters: mv.proposal().parameter_summary(),
        }
    }
}

/// Structured manifest describing a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Schema the manifest was written with.
    pub schema: SchemaVersion,
    /// Configuration used for the run.
    pub config: McmcConfig,
    /// Master seed every substream was derived from.
    pub master_seed: u64,
    /// Optional seed label captured from the configuration.
    pub seed_label: Option<String>,
    /// Structural hash of the model before sampling.
    pub model_hash: String,
    /// Heat of every chain at the end of the run.
    pub final_heats: Vec<f64>,
    /// Index of the cold chain at the end of the run.
    pub cold_chain: usize,
    /// Log posterior of the cold chain at the end of the run.
    pub final_posterior: f64,
    /// Cold chain move reports.
    pub moves: Vec<MoveReport>,
    /// Heat swap bookkeeping.
    pub swaps: SwapStats,
    /// Trace file, relative to the run directory.
    pub trace_file: Option<PathBuf>,
    /// Move summary file, relative to the run directory.
    pub summary_file: Option<PathBuf>,
}

impl RunManifest {
    /// Writes the manifest as pretty JSON, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<(), BayesError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|err| BayesError::serde("manifest-mkdir", err, parent))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| BayesError::serde("manifest-serialize", err, path))?;
        fs::write(path, json).map_err(|err| BayesError::serde("manifest-write", err, path))
    }

    /// Loads a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, BayesError> {
        let contents = fs::read_to_string(path)
            .map_err(|err| BayesError::serde("manifest-read", err, path))?;
        serde_json::from_str(&contents).map_err(|err| BayesError::serde("manifest-parse", err, path))
    }
}
