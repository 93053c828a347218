mod common;

use bayes_mcmc::tempering::{incremental_heat, swap_ln_ratio};
use bayes_mcmc::{LadderConfig, Mcmc, Mcmcmc, Move, ScheduleKind, SlidingProposal};
use proptest::prelude::*;

use common::normal_model;

fn base_chain(seed: u64) -> Mcmc {
    let fixture = normal_model();
    let mv = Move::new(Box::new(SlidingProposal::new(1.0)), &[fixture.mu], 1.0, true).unwrap();
    Mcmc::new(fixture.graph, fixture.model, vec![mv], ScheduleKind::Sequential, seed).unwrap()
}

fn ladder(chains: usize) -> LadderConfig {
    LadderConfig {
        chains,
        delta: 0.5,
        swap_interval: 1,
    }
}

fn sorted(mut heats: Vec<f64>) -> Vec<f64> {
    heats.sort_by(|a, b| a.total_cmp(b));
    heats
}

#[test]
fn incremental_ladder_heats() {
    assert_eq!(incremental_heat(0.5, 0), 1.0);
    assert_eq!(incremental_heat(0.5, 2), 0.5);
    assert_eq!(incremental_heat(0.0, 7), 1.0);
}

#[test]
fn swap_ratio_favours_moving_the_better_state_to_the_colder_chain() {
    // the hotter chain holds the better state, so exchanging is uphill
    assert!(swap_ln_ratio(1.0, -10.0, 0.5, -2.0) > 0.0);
    assert!(swap_ln_ratio(1.0, -2.0, 0.5, -10.0) < 0.0);
    assert_eq!(swap_ln_ratio(0.7, -3.0, 0.7, -9.0), 0.0);
}

#[test]
fn single_chain_never_swaps() {
    let mut sampler = Mcmcmc::new(base_chain(1), &ladder(1), 99).unwrap();
    sampler.initialize().unwrap();
    assert!(!sampler.swap_chains().unwrap());
    sampler.run(10, 5, None).unwrap();
    assert_eq!(sampler.swap_stats().attempted, 0);
    assert_eq!(sampler.swap_stats().acceptance_ratio(), None);
    assert_eq!(sampler.heats(), vec![1.0]);
}

#[test]
fn zero_chains_are_rejected() {
    let err = Mcmcmc::new(base_chain(2), &ladder(0), 99).unwrap_err();
    assert_eq!(err.code(), "invalid-tempering");
}

#[test]
fn replicas_are_independent_graphs_with_their_own_partition() {
    let sampler = Mcmcmc::new(base_chain(3), &ladder(3), 7).unwrap();
    assert_eq!(sampler.chains().len(), 3);
    assert_eq!(sampler.heats(), vec![1.0, incremental_heat(0.5, 1), 0.5]);
    for (index, chain) in sampler.chains().iter().enumerate() {
        let node = chain.model().dag_nodes()[0];
        let partition = chain.graph().status(node).unwrap().partition;
        assert_eq!(partition.active_pid, index);
        assert_eq!(partition.num_processes, 3);
    }
}

#[test]
fn summary_lists_the_cold_chain_first() {
    let mut sampler = Mcmcmc::new(base_chain(4), &ladder(2), 11).unwrap();
    sampler.run(5, 1, None).unwrap();
    let summary = sampler.move_summary();
    let first = summary.lines().next().unwrap();
    assert_eq!(first, format!("Chain {} (heat 1.0000)", sampler.cold_index()));
    assert_eq!(summary.matches("Chain ").count(), 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn swaps_permute_heats_and_track_the_cold_chain(seed in 0u64..1_000, chains in 2usize..5) {
        let mut sampler = Mcmcmc::new(base_chain(seed), &ladder(chains), seed).unwrap();
        let before = sorted(sampler.heats());
        sampler.initialize().unwrap();
        sampler.burnin(10, 5).unwrap();
        sampler.run(30, 10, None).unwrap();

        let heats = sampler.heats();
        prop_assert_eq!(sorted(heats.clone()), before);
        prop_assert_eq!(heats.iter().filter(|h| **h == 1.0).count(), 1);
        prop_assert_eq!(heats[sampler.cold_index()], 1.0);
        prop_assert_eq!(sampler.cold_chain().heat(), 1.0);

        let stats = sampler.swap_stats();
        prop_assert_eq!(stats.attempted, 40);
        prop_assert!(stats.accepted <= stats.attempted);
    }
}
