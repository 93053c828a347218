use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    describe::{self, DescribeArgs},
    run::{self, RunArgs},
    version::{self, VersionArgs},
};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "bayes-sim", about = "Bayesian DAG model sampler CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a model blueprint and sample it with the configured moves.
    Run(RunArgs),
    /// Print the vertices of a model blueprint and its stochastic ordering.
    Describe(DescribeArgs),
    /// Print the crate version.
    Version(VersionArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run::run(&args),
        Command::Describe(args) => describe::run(&args),
        Command::Version(args) => version::run(&args),
    }
}
