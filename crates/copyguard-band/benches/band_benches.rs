//! Criterion benchmarks for copyguard-band hot paths.
//!
//! Covers: curve evaluation, extrema search, and full probability draws.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand::rngs::StdRng;

use copyguard_band::{BandGenerator, ExtremaSolver, MatchOdds, ScoringCurve};
use copyguard_core::config::BandConfig;
use copyguard_core::types::{BandSide, Sport};

fn bench_curve(c: &mut Criterion) {
    let curve = ScoringCurve::default();

    c.bench_function("curve_evaluation", |b| {
        b.iter(|| curve.y(black_box(3.4), black_box(0.21)))
    });
}

fn bench_find_extrema(c: &mut Criterion) {
    let solver = ExtremaSolver::default();

    c.bench_function("find_extrema", |b| {
        b.iter(|| solver.find_extrema(black_box(2.75)))
    });
}

fn bench_generate_probability(c: &mut Criterion) {
    let generator = BandGenerator::with_rng(BandConfig::default(), StdRng::seed_from_u64(7))
        .expect("default config is valid");

    c.bench_function("generate_probability_favored", |b| {
        b.iter(|| generator.generate_probability(black_box(1.85), BandSide::Favored))
    });
    c.bench_function("generate_probability_underdog", |b| {
        b.iter(|| generator.generate_probability(black_box(4.6), BandSide::Underdog))
    });
}

fn bench_predict(c: &mut Criterion) {
    let generator = BandGenerator::with_rng(BandConfig::default(), StdRng::seed_from_u64(7))
        .expect("default config is valid");
    let odds = MatchOdds::new(2.1, 3.4).with_draw(3.3);

    c.bench_function("predict_match", |b| {
        b.iter(|| generator.predict(black_box(&odds), Sport::Soccer, BandSide::Favored))
    });
}

criterion_group!(
    benches,
    bench_curve,
    bench_find_extrema,
    bench_generate_probability,
    bench_predict,
);
criterion_main!(benches);
