//! Plan building, optimization and compilation benchmarks for quarry.
//!
//! Benchmarks for:
//! - DataFrame construction (schema resolution per transformation)
//! - Plan optimization
//! - SQL compilation per dialect
//! - End-to-end compilation throughput

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quarry_bench::utils::{generate_catalog, random_chain, report_query, SEED};
use quarry_common::{QuarryConfig, SUPPORTED_DIALECTS};
use quarry_client::Session;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn session(dialect: &str, width: usize) -> Session {
    let config = QuarryConfig::builder().dialect(dialect).build();
    Session::builder()
        .config(config)
        .catalog(Arc::new(generate_catalog(2, width)))
        .build()
        .expect("Failed to create session")
}

/// Benchmark building transformation chains of increasing depth.
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan/build");
    let session = session("ansi", 16);

    for depth in [4, 16, 64].iter() {
        group.bench_with_input(BenchmarkId::new("chain", depth), depth, |b, &depth| {
            b.iter(|| {
                let mut rng = StdRng::seed_from_u64(SEED);
                let base = session.table("t0").expect("Failed to scan");
                black_box(random_chain(&mut rng, base, depth))
            });
        });
    }

    group.bench_function("report", |b| b.iter(|| black_box(report_query(&session))));

    group.finish();
}

/// Benchmark the optimizer over prebuilt plans.
fn bench_optimize(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan/optimize");
    let session = session("ansi", 32);

    for depth in [4, 16, 64].iter() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let df = random_chain(&mut rng, session.table("t0").expect("Failed to scan"), *depth)
            .expect("Failed to build chain");
        group.bench_with_input(BenchmarkId::new("chain", depth), df.plan(), |b, plan| {
            b.iter(|| black_box(session.optimize(black_box(plan))));
        });
    }

    let report = report_query(&session).expect("Failed to build report");
    group.bench_function("report", |b| {
        b.iter(|| black_box(session.optimize(black_box(report.plan()))));
    });

    group.finish();
}

/// Benchmark compiling an already optimized plan in every dialect.
fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql/compile");

    for dialect in SUPPORTED_DIALECTS {
        let session = session(dialect, 16);
        let report = report_query(&session).expect("Failed to build report");
        let optimized = session.optimize(report.plan()).expect("Failed to optimize");

        group.bench_with_input(BenchmarkId::new("report", dialect), &optimized, |b, plan| {
            b.iter(|| black_box(session.compiler().compile(black_box(plan))));
        });
    }

    group.finish();
}

/// Benchmark the full path from DataFrame to SQL text (many queries).
fn bench_to_sql_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql/to_sql_throughput");
    let session = session("postgres", 16);

    let frames: Vec<_> = (0..32u64)
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(SEED + i);
            random_chain(&mut rng, session.table("t1").expect("Failed to scan"), 8)
                .expect("Failed to build chain")
        })
        .collect();

    for count in [100, 500, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let mut compiled = 0;
                for i in 0..count {
                    if frames[i % frames.len()].to_sql().is_ok() {
                        compiled += 1;
                    }
                }
                black_box(compiled)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_build,
    bench_optimize,
    bench_compile,
    bench_to_sql_throughput,
);
criterion_main!(benches);
