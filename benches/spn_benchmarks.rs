//! Mixed SPN benchmarks (structure learning and inference)
//!
//! Toyota Way: Genchi Genbutsu (measure, don't guess)
//!
//! Run with: cargo bench --bench spn_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use density_bench::spn::{LearnerParams, Spn};
use density_bench::{Context, Matrix, Schema};

/// Two clusters over four continuous and two discrete columns.
fn clustered_data(rows: usize) -> Matrix {
    let data: Vec<Vec<f64>> = (0..rows)
        .map(|i| {
            let shift = if i % 2 == 0 { 0.0 } else { 5.0 };
            let noise = (i % 17) as f64 / 17.0;
            vec![
                shift + noise,
                shift * 2.0 - noise,
                (i % 29) as f64 / 29.0,
                shift + (noise * 3.0).sin(),
                (i % 2) as f64,
                (i % 5) as f64,
            ]
        })
        .collect();
    Matrix::from_rows(&data).unwrap()
}

fn context(data: &Matrix) -> Context {
    let mut ctx = Context::new(Schema::from_type_string("ccccuu").unwrap());
    ctx.add_domains(data).unwrap();
    ctx
}

/// Benchmark structure learning at the default slice size
fn bench_learn(c: &mut Criterion) {
    let mut group = c.benchmark_group("spn_learn");
    let params = LearnerParams::default();

    for rows in [500, 2_000] {
        let data = clustered_data(rows);
        let ctx = context(&data);
        group.bench_with_input(BenchmarkId::new("min_instances_20", rows), &data, |b, data| {
            b.iter(|| Spn::learn(black_box(data), &ctx, &params).unwrap());
        });
    }

    group.finish();
}

/// Benchmark per-row log-likelihood evaluation
fn bench_log_likelihood(c: &mut Criterion) {
    let mut group = c.benchmark_group("spn_log_likelihood");
    let train = clustered_data(2_000);
    let ctx = context(&train);
    let (spn, _) = Spn::learn(&train, &ctx, &LearnerParams::default()).unwrap();
    let test = clustered_data(1_000);

    group.bench_with_input(BenchmarkId::new("rows", test.rows()), &test, |b, test| {
        b.iter(|| spn.log_likelihood_rows(black_box(test)).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_learn, bench_log_likelihood);
criterion_main!(benches);
