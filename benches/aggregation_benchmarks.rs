//! Performance benchmarks for the map-side combiner
//! Compares end-to-end runs with and without combining, and the merge of
//! combined partials sequentially versus in parallel

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use devstats::pipeline::combiner::{combine, merge_parallel};
use devstats::pipeline::{
    AggregateKind, ExecutionSettings, IntermediateEntry, JobPreset, Pipeline, ReferenceSource,
    ReferenceTable, Shard,
};
use std::hint::black_box;
use stillwater::Semigroup;

fn reference() -> ReferenceSource {
    ReferenceSource::Table(ReferenceTable::from_rows(
        (1..1000).map(|id| (id, format!("C{}", id % 16))),
    ))
}

fn shards(count: usize, records: usize) -> Vec<Shard> {
    (0..count)
        .map(|shard| {
            Shard::Lines(
                (0..records)
                    .map(|i| format!("{},NULL,{}.5", (i * 7 + shard) % 999 + 1, i % 100))
                    .collect(),
            )
        })
        .collect()
}

fn entries(size: usize) -> Vec<IntermediateEntry> {
    (0..size)
        .map(|i| IntermediateEntry {
            key: format!("C{}", i % 16),
            value: i as f64,
        })
        .collect()
}

/// Benchmark a full stats-1 run with the combiner on and off
fn bench_pipeline_combiner(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_combiner");
    let reference = reference();

    for records in [1_000, 10_000, 50_000] {
        let input = shards(4, records);

        for combiner in [false, true] {
            let label = if combiner { "combined" } else { "uncombined" };
            let pipeline = Pipeline::new(
                JobPreset::StatsOne.spec(),
                ExecutionSettings {
                    workers: 4,
                    reducers: 2,
                    combiner,
                    spill_threshold: 1_000,
                },
            );
            group.bench_with_input(BenchmarkId::new(label, records), &input, |b, input| {
                b.iter(|| black_box(pipeline.run(&reference, input.clone())))
            });
        }
    }

    group.finish();
}

/// Benchmark merging per-worker combined maps
fn bench_partial_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("partial_merge");

    for workers in [4, 16, 64] {
        let maps: Vec<_> = (0..workers)
            .map(|_| combine(AggregateKind::Mean, entries(2_000)))
            .collect();

        group.bench_with_input(BenchmarkId::new("sequential", workers), &maps, |b, maps| {
            b.iter(|| {
                let merged = maps
                    .iter()
                    .cloned()
                    .reduce(|a, b| a.combine(b))
                    .unwrap_or_default();
                black_box(merged)
            })
        });

        group.bench_with_input(BenchmarkId::new("parallel", workers), &maps, |b, maps| {
            b.iter(|| black_box(merge_parallel(maps.clone())))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pipeline_combiner, bench_partial_merge);
criterion_main!(benches);
