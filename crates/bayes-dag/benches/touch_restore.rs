use bayes_core::NodeId;
use bayes_dag::distributions::Normal;
use bayes_dag::functions::{Exp, Sum};
use bayes_dag::DagGraph;
use criterion::{criterion_group, criterion_main, Criterion};

/// Stochastic root fanning out into `width` deterministic branches of `depth` nodes.
fn build_fan(width: usize, depth: usize) -> (DagGraph, NodeId) {
    let mut graph = DagGraph::new();
    let mean = graph.add_constant("mean", 0.0);
    let sd = graph.add_constant("sd", 1.0);
    let root = graph
        .add_stochastic("root", Box::new(Normal), &[mean, sd], 0.1)
        .unwrap();
    for branch in 0..width {
        let mut tip = root;
        for level in 0..depth {
            tip = if level % 2 == 0 {
                graph
                    .add_deterministic(format!("b{branch}_{level}"), Box::new(Exp), &[tip])
                    .unwrap()
            } else {
                graph
                    .add_deterministic(format!("b{branch}_{level}"), Box::new(Sum), &[tip, mean])
                    .unwrap()
            };
        }
        graph
            .add_stochastic(format!("leaf{branch}"), Box::new(Normal), &[tip, sd], 0.0)
            .unwrap();
    }
    (graph, root)
}

fn bench_touch_restore(c: &mut Criterion) {
    let (mut graph, root) = build_fan(16, 8);
    c.bench_function("touch_restore_fan_16x8", |b| {
        b.iter(|| {
            graph.set_value(root, 0.7).unwrap();
            let _ = graph.restore(root).unwrap();
        });
    });
    c.bench_function("touch_keep_fan_16x8", |b| {
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            graph.set_value(root, if flip { 0.7 } else { 0.1 }).unwrap();
            let _ = graph.keep(root).unwrap();
        });
    });
}

criterion_group!(benches, bench_touch_restore);
criterion_main!(benches);
