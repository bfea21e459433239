//! Shared builders for E2E and adversarial tests.

use std::io::Write;

use chrono::{DateTime, Duration, TimeZone, Utc};
use copyguard_band::BandGenerator;
use copyguard_core::config::{BandConfig, DetectionConfig};
use copyguard_core::corpus::{CorpusSnapshot, MatchRecord, PredictionRecord};
use copyguard_core::types::League;
use copyguard_detect::CopycatDetectionEngine;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::NamedTempFile;

/// Kick-off time `n` days after the fixed epoch used by the tests.
pub fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 8, 16, 19, 30, 0).unwrap() + Duration::days(n)
}

/// Match id for the `i`-th fixture of a league.
pub fn match_id(league: League, i: usize) -> String {
    format!("{}-{i:03}", league.code().to_lowercase())
}

/// Builds corpus snapshots in the external record shapes.
#[derive(Debug, Default, Clone)]
pub struct SnapshotBuilder {
    snapshot: CorpusSnapshot,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` fixtures for `league`, one per day starting at `first_day`.
    pub fn fixtures(mut self, league: League, count: usize, first_day: i64) -> Self {
        for i in 0..count {
            self.snapshot.matches.push(MatchRecord {
                id: match_id(league, i),
                league: league.code().to_string(),
                scheduled_date: day(first_day + i as i64),
                home_team: format!("Home {i}"),
                away_team: format!("Away {i}"),
                home_score: None,
                away_score: None,
                is_complete: false,
            });
        }
        self
    }

    /// Add one raw prediction record.
    pub fn record(mut self, uid: u32, match_id: &str, league: &str, outcome: &str, p: f64) -> Self {
        self.snapshot.predictions.push(PredictionRecord {
            participant_id: uid,
            match_id: match_id.to_string(),
            league: league.to_string(),
            chosen_outcome: outcome.to_string(),
            probability: p,
            submitted_at: None,
        });
        self
    }

    /// Home-team prediction by `uid` on fixture `i` of `league`.
    pub fn home(self, uid: u32, league: League, i: usize, p: f64) -> Self {
        let id = match_id(league, i);
        self.record(uid, &id, league.code(), "HomeTeam", p)
    }

    pub fn build(self) -> CorpusSnapshot {
        self.snapshot
    }
}

/// Independent-looking probability for `uid` on fixture `i`.
///
/// Distinct participants never collide: the per-participant offsets are
/// further apart than the per-fixture drift.
pub fn independent_probability(uid: u32, i: usize) -> f64 {
    0.20 + 0.05 * f64::from(uid % 12) + 0.001 * (i % 40) as f64
}

/// Serialize a snapshot into a temporary JSON file.
pub fn write_snapshot(snapshot: &CorpusSnapshot) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("create temp snapshot");
    let body = serde_json::to_vec_pretty(snapshot).expect("serialize snapshot");
    file.write_all(&body).expect("write snapshot");
    file
}

pub fn seeded_engine(config: DetectionConfig, seed: u64) -> CopycatDetectionEngine<StdRng> {
    CopycatDetectionEngine::with_rng(config, StdRng::seed_from_u64(seed)).expect("valid config")
}

pub fn seeded_generator(seed: u64) -> BandGenerator<StdRng> {
    BandGenerator::with_rng(BandConfig::default(), StdRng::seed_from_u64(seed)).expect("valid config")
}
