use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use smartcode_core::{Direction, GraphEdge, GraphNode};
use smartcode_layout::bridge::DiagramBridge;
use smartcode_layout::engine::LayeredLayout;
use smartcode_layout::graph::CallGraph;
use std::hint::black_box;

fn call_labels(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("fn_{}", i % 17)).collect()
}

/// Benchmark: build a path graph from N call labels
fn bench_build_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_call_graph");

    for count in [10, 100, 1_000] {
        let calls = call_labels(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &calls, |b, calls| {
            b.iter(|| CallGraph::from_calls(black_box(calls)));
        });
    }

    group.finish();
}

/// Benchmark: layered layout of a path graph of N calls
fn bench_layout_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_path");

    for count in [10, 100, 1_000] {
        let graph = CallGraph::from_calls(&call_labels(count));
        let engine = LayeredLayout::default();
        group.bench_with_input(BenchmarkId::from_parameter(count), &graph, |b, graph| {
            b.iter(|| engine.compute_graph(black_box(graph)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark: layered DAG, `width` nodes per rank, fully connected between
/// adjacent ranks in reverse order to force crossing reduction work.
fn bench_layout_layered_dag(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_layered_dag");

    for width in [4usize, 8, 16] {
        let ranks = 10;
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        for r in 0..ranks {
            for k in 0..width {
                nodes.push(GraphNode::new(format!("r{r}n{k}"), format!("call {r}.{k}")));
            }
        }
        for r in 0..ranks - 1 {
            for k in 0..width {
                let target = width - 1 - k;
                edges.push(GraphEdge::new(
                    format!("e{r}-{k}"),
                    format!("r{r}n{k}"),
                    format!("r{}n{target}", r + 1),
                ));
            }
        }

        let engine = LayeredLayout::default();
        group.bench_with_input(BenchmarkId::from_parameter(width), &(nodes, edges), |b, (n, e)| {
            b.iter(|| engine.compute(black_box(n), black_box(e)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark: bridge update with unchanged input (change detection only)
fn bench_bridge_unchanged(c: &mut Criterion) {
    c.bench_function("bridge_update_unchanged_100", |b| {
        let calls = call_labels(100);
        let mut bridge = DiagramBridge::default();
        bridge.update(&calls, Direction::LeftToRight).unwrap();

        b.iter(|| {
            bridge.update(black_box(&calls), Direction::LeftToRight).unwrap();
        });
    });
}

/// Benchmark: bridge update alternating direction (full recompute each time)
fn bench_bridge_recompute(c: &mut Criterion) {
    c.bench_function("bridge_update_recompute_100", |b| {
        let calls = call_labels(100);
        let mut bridge = DiagramBridge::default();
        let mut flip = false;

        b.iter(|| {
            flip = !flip;
            let direction = if flip { Direction::TopToBottom } else { Direction::LeftToRight };
            bridge.update(&calls, direction).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_build_graph,
    bench_layout_path,
    bench_layout_layered_dag,
    bench_bridge_unchanged,
    bench_bridge_recompute,
);
criterion_main!(benches);
