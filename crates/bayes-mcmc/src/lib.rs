#![deny(missing_docs)]
#![doc = include_str!("../docs/sampler-api.md")]

/// Samplers driving one chain.
pub mod chain;
/// YAML configuration schema and defaults.
pub mod config;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// Run manifest serialization helpers.
pub mod manifest;
/// Trace file writer.
pub mod monitor;
/// Moves and their bookkeeping.
pub mod moves;
/// Proposal kernels.
pub mod proposal;
/// Blueprint-to-artefacts entry point.
pub mod runner;
/// Move selection per generation.
pub mod schedule;
/// Metropolis-coupled chains.
pub mod tempering;

pub use chain::Mcmc;
pub use config::{HeatConfig, LadderConfig, McmcConfig, MoveSpec, OutputConfig, ProposalKind, SeedPolicy};
pub use manifest::{MoveReport, RunManifest};
pub use monitor::{TraceMonitor, TraceRow};
pub use moves::{Move, MoveState};
pub use proposal::{GibbsRedraw, Proposal, ScaleProposal, SlidingProposal};
pub use runner::{run, RunSummary};
pub use schedule::{MoveSchedule, ScheduleKind};
pub use tempering::{Mcmcmc, SwapStats};
