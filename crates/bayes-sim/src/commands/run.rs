use std::error::Error;
use std::fs;
use std::path::PathBuf;

use bayes_dag::ModelBlueprint;
use bayes_mcmc::{run as run_sampler, McmcConfig};
use clap::Args;
use tracing::info;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML model blueprint.
    #[arg(long)]
    pub model: PathBuf,
    /// YAML sampler configuration listing the moves.
    #[arg(long)]
    pub config: PathBuf,
    /// Output directory for trace, manifest and move table.
    #[arg(long)]
    pub out: PathBuf,
    /// Overrides the master seed of the configuration.
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let blueprint = ModelBlueprint::load(&args.model)?;
    let mut config = McmcConfig::load(&args.config)?;
    config.output.run_directory = Some(args.out.clone());
    if let Some(seed) = args.seed {
        config.seed_policy.master_seed = seed;
    }

    let summary = run_sampler(&config, &blueprint)?;

    fs::create_dir_all(&args.out)?;
    let json = serde_json::to_string_pretty(&summary)?;
    fs::write(args.out.join("summary.json"), json)?;
    // Keep the inputs next to the artefacts so the run can be replayed.
    fs::copy(&args.config, args.out.join("config.yaml")).ok();
    fs::copy(&args.model, args.out.join("model.yaml")).ok();

    print!("{}", summary.move_table);
    info!(
        out = %args.out.display(),
        rows = summary.trace_rows,
        posterior = summary.final_posterior,
        "run written"
    );
    Ok(())
}
