use std::error::Error;
use std::path::PathBuf;

use bayes_core::RngHandle;
use bayes_dag::{DagGraph, ModelBlueprint};
use bayes_mcmc::determinism::build_seed;
use bayes_mcmc::SeedPolicy;
use clap::Args;

#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// YAML model blueprint.
    #[arg(long)]
    pub model: PathBuf,
    /// Master seed used to draw missing initial values.
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run(args: &DescribeArgs) -> Result<(), Box<dyn Error>> {
    let blueprint = ModelBlueprint::load(&args.model)?;
    let seed = args
        .seed
        .unwrap_or_else(|| SeedPolicy::default().master_seed);
    let mut graph = DagGraph::new();
    let built = blueprint.build(&mut graph, &mut RngHandle::from_seed(build_seed(seed)))?;

    print!("{}", built.model.summary(&graph));
    let ordered = built
        .model
        .ordered_stochastic_nodes(&graph)?
        .into_iter()
        .map(|node| graph.label(node))
        .collect::<Result<Vec<_>, _>>()?;
    println!("Stochastic order: {}", ordered.join(" -> "));
    println!("Model hash: {}", bayes_dag::canonical_hash(&graph, built.model.dag_nodes())?);
    Ok(())
}
