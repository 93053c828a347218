use std::fs;
use std::path::{Path, PathBuf};

use bayes_core::errors::{BayesError, ErrorInfo};
use bayes_dag::BuiltModel;
use serde::{Deserialize, Serialize};

use crate::moves::Move;
use crate::proposal::{GibbsRedraw, Proposal, ScaleProposal, SlidingProposal};
use crate::schedule::ScheduleKind;

/// YAML-configurable parameters governing a sampler run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McmcConfig {
    /// Generations sampled after burn-in.
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Generations run before sampling, with auto-tuning.
    #[serde(default)]
    pub burn_in: usize,
    /// Burn-in generations between auto-tuning calls (0 disables tuning).
    #[serde(default = "default_tuning_interval")]
    pub tuning_interval: usize,
    /// A trace row is written every `thinning` generations.
    #[serde(default = "default_thinning")]
    pub thinning: usize,
    /// Move selection strategy.
    #[serde(default)]
    pub schedule: ScheduleKind,
    /// Heats applied to the likelihood and the prior.
    #[serde(default)]
    pub heats: HeatConfig,
    /// Metropolis-coupled chain settings.
    #[serde(default)]
    pub ladder: LadderConfig,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Output directory configuration.
    #[serde(default)]
    pub output: OutputConfig,
    /// Moves to register, in order.
    #[serde(default)]
    pub moves: Vec<MoveSpec>,
}

fn default_generations() -> usize {
    1000
}

fn default_tuning_interval() -> usize {
    100
}

fn default_thinning() -> usize {
    10
}

impl Default for McmcConfig {
    fn default() -> Self {
        Self {
            generations: default_generations(),
            burn_in: 0,
            tuning_interval: default_tuning_interval(),
            thinning: default_thinning(),
            schedule: ScheduleKind::default(),
            heats: HeatConfig::default(),
            ladder: LadderConfig::default(),
            seed_policy: SeedPolicy::default(),
            output: OutputConfig::default(),
            moves: Vec::new(),
        }
    }
}

impl McmcConfig {
    /// Reads and validates a YAML configuration.
    pub fn load(path: &Path) -> Result<Self, BayesError> {
        let contents =
            fs::read_to_string(path).map_err(|err| BayesError::serde("config-read", err, path))?;
        let config: McmcConfig = serde_yaml::from_str(&contents)
            .map_err(|err| BayesError::serde("config-parse", err, path))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the samplers cannot run with.
    pub fn validate(&self) -> Result<(), BayesError> {
        if self.thinning == 0 {
            return Err(config_error("invalid-thinning", "thinning must be at least 1"));
        }
        if self.ladder.chains == 0 {
            return Err(config_error("invalid-chains", "at least one chain is required"));
        }
        if !(self.ladder.delta.is_finite() && self.ladder.delta >= 0.0) {
            return Err(config_error("invalid-delta", "heating delta must be finite and non-negative")
                .with_context("delta", self.ladder.delta));
        }
        for (name, heat) in [
            ("likelihood", self.heats.likelihood),
            ("prior", self.heats.prior),
        ] {
            if !heat.is_finite() || heat < 0.0 {
                return Err(config_error("invalid-heat", "heats must be finite and non-negative")
                    .with_context("heat", name)
                    .with_context("value", heat));
            }
        }
        if self.output.delimiter.len_utf8() != 1 {
            return Err(config_error("invalid-delimiter", "trace delimiter must be a single byte")
                .with_context("delimiter", self.output.delimiter));
        }
        Ok(())
    }
}

/// Heats multiplying the likelihood and prior terms of the acceptance ratio.
///
/// The chain heat applied on top of both comes from the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatConfig {
    /// Heat applied to the likelihood only.
    #[serde(default = "default_heat")]
    pub likelihood: f64,
    /// Heat applied to the prior only.
    #[serde(default = "default_heat")]
    pub prior: f64,
}

fn default_heat() -> f64 {
    1.0
}

impl Default for HeatConfig {
    fn default() -> Self {
        Self {
            likelihood: default_heat(),
            prior: default_heat(),
        }
    }
}

/// Metropolis-coupled chain ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LadderConfig {
    /// Number of chains; one runs a plain single chain.
    #[serde(default = "default_chains")]
    pub chains: usize,
    /// Heating increment: chain `i` runs at `1 / (1 + delta * i)`.
    #[serde(default = "default_delta")]
    pub delta: f64,
    /// Generations between swap attempts.
    #[serde(default = "default_swap_interval")]
    pub swap_interval: usize,
}

fn default_chains() -> usize {
    1
}

fn default_delta() -> f64 {
    0.2
}

fn default_swap_interval() -> usize {
    1
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            chains: default_chains(),
            delta: default_delta(),
            swap_interval: default_swap_interval(),
        }
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed every substream is derived from.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in manifests.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x5EED_BA7E_5000_0001
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Output layout of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for run artefacts; created if missing.
    #[serde(default)]
    pub run_directory: Option<PathBuf>,
    /// Trace file name relative to `run_directory`.
    #[serde(default = "default_trace_file")]
    pub trace_file: PathBuf,
    /// Manifest file name relative to `run_directory`.
    #[serde(default = "default_manifest_file")]
    pub manifest_file: PathBuf,
    /// Move summary file name relative to `run_directory`.
    #[serde(default = "default_summary_file")]
    pub summary_file: PathBuf,
    /// Trace column delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Node names written to the trace; all visible nodes when absent.
    #[serde(default)]
    pub monitored: Option<Vec<String>>,
}

fn default_trace_file() -> PathBuf {
    PathBuf::from("trace.log")
}

fn default_manifest_file() -> PathBuf {
    PathBuf::from("manifest.json")
}

fn default_summary_file() -> PathBuf {
    PathBuf::from("moves.txt")
}

fn default_delimiter() -> char {
    '\t'
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_directory: None,
            trace_file: default_trace_file(),
            manifest_file: default_manifest_file(),
            summary_file: default_summary_file(),
            delimiter: default_delimiter(),
            monitored: None,
        }
    }
}

/// Proposal kernels available to configured moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProposalKind {
    /// Multiplicative scaling.
    Scale,
    /// Uniform sliding window.
    Sliding,
    /// Redraw from the distribution.
    Gibbs,
}

/// One configured move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveSpec {
    /// Kernel used by the move.
    pub kind: ProposalKind,
    /// Blueprint name of the node the move targets.
    pub node: String,
    /// Selection weight.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Initial `lambda` (scale) or `delta` (sliding).
    #[serde(default = "default_tuning")]
    pub tuning: f64,
    /// Whether burn-in tunes the kernel.
    #[serde(default = "default_auto_tune")]
    pub auto_tune: bool,
}

fn default_weight() -> f64 {
    1.0
}

fn default_tuning() -> f64 {
    1.0
}

fn default_auto_tune() -> bool {
    true
}

impl MoveSpec {
    /// Binds the move to the model clone of the named node.
    pub fn build(&self, built: &BuiltModel) -> Result<Move, BayesError> {
        let node = built.model_node(&self.node).ok_or_else(|| {
            config_error("unknown-move-target", "move targets a node outside the model")
                .with_context("node", &self.node)
        })?;
        let proposal: Box<dyn Proposal> = match self.kind {
            ProposalKind::Scale => Box::new(ScaleProposal::new(self.tuning)),
            ProposalKind::Sliding => Box::new(SlidingProposal::new(self.tuning)),
            ProposalKind::Gibbs => Box::new(GibbsRedraw),
        };
        Ok(Move::new(proposal, &[node], self.weight, self.auto_tune)?
            .with_name(format!("{}({})", self.kind.label(), self.node)))
    }
}

impl ProposalKind {
    fn label(&self) -> &'static str {
        match self {
            ProposalKind::Scale => "Scale",
            ProposalKind::Sliding => "Slide",
            ProposalKind::Gibbs => "Gibbs",
        }
    }
}

fn config_error(code: &str, message: &str) -> BayesError {
    BayesError::Config(ErrorInfo::new(code, message))
}
