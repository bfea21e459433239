//! Criterion benchmarks for copyguard-detect.
//!
//! Covers: relationship construction and a full league analysis over a
//! synthetic population with a planted copycat ring.

use std::collections::BTreeSet;

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use copyguard_core::config::DetectionConfig;
use copyguard_core::types::{
    League, MatchId, MinerId, Prediction, PredictionWithMatchData, ProbabilityChoice,
    ScheduledMatch,
};
use copyguard_detect::{CopycatDetectionEngine, RelationshipAnalyzer};

fn population(miners: u32, matches: usize) -> (Vec<PredictionWithMatchData>, Vec<ScheduledMatch>) {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap();
    let mut rng = StdRng::seed_from_u64(2024);
    let schedule: Vec<ScheduledMatch> = (0..matches)
        .map(|i| ScheduledMatch::new(format!("bench-{i}"), base + Duration::days(i as i64)))
        .collect();

    let mut predictions = Vec::new();
    for m in &schedule {
        let ring_value = f64::from(rng.gen_range(3000u32..7000)) / 10_000.0;
        for miner in 0..miners {
            // Miners 0..4 copy each other.
            let probability = if miner < 4 {
                ring_value
            } else {
                f64::from(rng.gen_range(1000u32..9000)) / 10_000.0
            };
            predictions.push(PredictionWithMatchData {
                prediction: Prediction {
                    miner: MinerId(miner),
                    match_id: MatchId(m.match_id.as_str().to_string()),
                    league: League::Nfl,
                    choice: ProbabilityChoice::HomeTeam,
                    probability,
                    submitted_at: None,
                },
                match_date: m.match_date,
            });
        }
    }
    (predictions, schedule)
}

fn bench_relationships(c: &mut Criterion) {
    let (predictions, schedule) = population(64, 40);
    let analyzer = RelationshipAnalyzer::from_config(&DetectionConfig::default());
    let excluded = BTreeSet::new();

    c.bench_function("relationships_64x40", |b| {
        b.iter(|| {
            analyzer.analyze(
                League::Nfl,
                black_box(&predictions),
                black_box(&schedule),
                &excluded,
            )
        })
    });
}

fn bench_analyze_league(c: &mut Criterion) {
    let (predictions, schedule) = population(64, 40);
    let engine = CopycatDetectionEngine::with_rng(DetectionConfig::default(), StdRng::seed_from_u64(1))
        .expect("default config is valid");

    c.bench_function("analyze_league_64x40", |b| {
        b.iter(|| engine.analyze_league(League::Nfl, black_box(&predictions), black_box(&schedule)))
    });
}

criterion_group!(benches, bench_relationships, bench_analyze_league);
criterion_main!(benches);
