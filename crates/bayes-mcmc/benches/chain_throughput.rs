use bayes_core::RngHandle;
use bayes_dag::{DagGraph, ModelBlueprint};
use bayes_mcmc::{LadderConfig, Mcmc, Mcmcmc, McmcConfig, ScheduleKind};
use criterion::{criterion_group, criterion_main, Criterion};

/// Hierarchical normal model: `groups` group means with `per_group` observations each.
fn hierarchy(groups: usize, per_group: usize) -> (ModelBlueprint, McmcConfig) {
    let mut yaml = String::from(
        "nodes:\n  - {name: zero, kind: constant, value: 0.0}\n  - {name: one, kind: constant, value: 1.0}\n  - {name: top, kind: stochastic, distribution: normal, parents: [zero, one], value: 0.0}\n",
    );
    let mut moves = String::from("moves:\n  - {kind: sliding, node: top}\n");
    let mut sources = Vec::new();
    for g in 0..groups {
        yaml.push_str(&format!(
            "  - {{name: g{g}, kind: stochastic, distribution: normal, parents: [top, one], value: 0.0}}\n"
        ));
        moves.push_str(&format!("  - {{kind: sliding, node: g{g}}}\n"));
        for i in 0..per_group {
            let name = format!("y{g}_{i}");
            yaml.push_str(&format!(
                "  - {{name: {name}, kind: stochastic, distribution: normal, parents: [g{g}, one], value: {}, clamped: true}}\n",
                (g + i) as f64 * 0.1
            ));
            sources.push(name);
        }
    }
    yaml.push_str(&format!("sources: [{}]\n", sources.join(", ")));
    let blueprint = serde_yaml::from_str(&yaml).unwrap();
    let config = serde_yaml::from_str(&moves).unwrap();
    (blueprint, config)
}

fn single_chain(blueprint: &ModelBlueprint, config: &McmcConfig) -> Mcmc {
    let mut graph = DagGraph::new();
    let built = blueprint.build(&mut graph, &mut RngHandle::from_seed(1)).unwrap();
    let moves = bayes_mcmc::runner::build_moves(config, &built).unwrap();
    let mut chain = Mcmc::new(graph, built.model, moves, ScheduleKind::Sequential, 2).unwrap();
    chain.initialize().unwrap();
    chain
}

fn bench_single_chain(c: &mut Criterion) {
    let (blueprint, config) = hierarchy(8, 16);
    let mut chain = single_chain(&blueprint, &config);
    c.bench_function("mcmc_cycle_hierarchy_8x16", |b| {
        b.iter(|| chain.advance().unwrap())
    });
}

fn bench_tempered(c: &mut Criterion) {
    let (blueprint, config) = hierarchy(8, 16);
    let base = single_chain(&blueprint, &config);
    let ladder = LadderConfig {
        chains: 4,
        delta: 0.2,
        swap_interval: 1,
    };
    let mut sampler = Mcmcmc::new(base, &ladder, 3).unwrap();
    c.bench_function("mcmcmc_generation_4_chains", |b| {
        b.iter(|| sampler.run(1, 1, None).unwrap())
    });
}

criterion_group!(benches, bench_single_chain, bench_tempered);
criterion_main!(benches);
