//! Read-only prediction corpus.
//!
//! [`PredictionCorpus`] is the seam to the external persistence layer: given a
//! league and a time window it hands back fully materialized predictions and
//! the chronological match list. [`MemoryCorpus`] is the in-process
//! implementation, fed either programmatically or from a JSON snapshot whose
//! records use the external (string-typed) field shapes.
//!
//! External records are validated here. A record with an unknown outcome or
//! league, an out-of-range probability, or a dangling match reference is
//! rejected on its own and counted; the rest of the snapshot still loads.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CorpusError;
use crate::types::{
    League, Match, MatchId, MinerId, Prediction, PredictionWithMatchData, ScheduledMatch,
};

/// Read-only view of predictions and matches, per league.
///
/// Implementations must not mutate their data between the two calls of one
/// analysis pass.
pub trait PredictionCorpus: Send + Sync {
    /// All predictions on matches of `league` whose date lies in `window`.
    fn league_predictions(
        &self,
        league: League,
        window: &AnalysisWindow,
    ) -> Result<Vec<PredictionWithMatchData>, CorpusError>;

    /// Matches of `league` inside `window`, sorted by date ascending.
    fn ordered_matches(
        &self,
        league: League,
        window: &AnalysisWindow,
    ) -> Result<Vec<ScheduledMatch>, CorpusError>;
}

/// Half-open time window `[start, end)` over match dates.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalysisWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AnalysisWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, CorpusError> {
        if start >= end {
            return Err(CorpusError::InvalidWindow {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// The `days` days leading up to `end`.
    ///
    /// Fails when the start would fall before the earliest representable date.
    pub fn trailing(end: DateTime<Utc>, days: u32) -> Result<Self, CorpusError> {
        let start = Duration::try_days(i64::from(days))
            .and_then(|span| end.checked_sub_signed(span))
            .ok_or_else(|| CorpusError::InvalidWindow {
                start: format!("{days} days before {}", end.to_rfc3339()),
                end: end.to_rfc3339(),
            })?;
        Ok(Self { start, end })
    }

    /// Window covering every representable date.
    pub fn unbounded() -> Self {
        Self {
            start: DateTime::<Utc>::MIN_UTC,
            end: DateTime::<Utc>::MAX_UTC,
        }
    }

    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        self.start <= date && date < self.end
    }
}

// ---------------------------------------------------------------------------
// External record shapes
// ---------------------------------------------------------------------------

/// Match row as exported by the persistence layer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id: String,
    pub league: String,
    pub scheduled_date: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub away_score: Option<u32>,
    #[serde(default)]
    pub is_complete: bool,
}

/// Prediction row as exported by the persistence layer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub participant_id: u32,
    pub match_id: String,
    pub league: String,
    pub chosen_outcome: String,
    pub probability: f64,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Everything the persistence layer exports for one analysis epoch.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CorpusSnapshot {
    #[serde(default)]
    pub matches: Vec<MatchRecord>,
    #[serde(default)]
    pub predictions: Vec<PredictionRecord>,
}

impl TryFrom<MatchRecord> for Match {
    type Error = CorpusError;

    fn try_from(r: MatchRecord) -> Result<Self, Self::Error> {
        Ok(Match {
            id: MatchId(r.id),
            league: r.league.parse()?,
            match_date: r.scheduled_date,
            home_team: r.home_team,
            away_team: r.away_team,
            home_score: r.home_score,
            away_score: r.away_score,
            is_complete: r.is_complete,
        })
    }
}

impl TryFrom<PredictionRecord> for Prediction {
    type Error = CorpusError;

    fn try_from(r: PredictionRecord) -> Result<Self, Self::Error> {
        let prediction = Prediction {
            miner: MinerId(r.participant_id),
            match_id: MatchId(r.match_id),
            league: r.league.parse()?,
            choice: r.chosen_outcome.parse()?,
            probability: r.probability,
            submitted_at: r.submitted_at,
        };
        prediction.validate()?;
        Ok(prediction)
    }
}

// ---------------------------------------------------------------------------
// MemoryCorpus
// ---------------------------------------------------------------------------

/// In-memory corpus. Immutable once handed to an analysis.
#[derive(Debug, Clone, Default)]
pub struct MemoryCorpus {
    matches: BTreeMap<MatchId, Match>,
    predictions: Vec<Prediction>,
    rejected: usize,
}

impl MemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a corpus from an exported snapshot, skipping invalid records.
    ///
    /// Matches are loaded before predictions so that every accepted
    /// prediction references a known match.
    pub fn from_snapshot(snapshot: CorpusSnapshot) -> Self {
        let mut corpus = Self::new();

        for record in snapshot.matches {
            let id = record.id.clone();
            if let Err(e) = Match::try_from(record).and_then(|m| corpus.insert_match(m)) {
                warn!(match_id = %id, error = %e, "corpus: rejected match record");
                corpus.rejected += 1;
            }
        }

        for record in snapshot.predictions {
            let miner = record.participant_id;
            let match_id = record.match_id.clone();
            if let Err(e) = Prediction::try_from(record).and_then(|p| corpus.insert_prediction(p))
            {
                warn!(miner, match_id = %match_id, error = %e, "corpus: rejected prediction record");
                corpus.rejected += 1;
            }
        }

        debug!(
            matches = corpus.matches.len(),
            predictions = corpus.predictions.len(),
            rejected = corpus.rejected,
            "corpus: snapshot loaded"
        );
        corpus
    }

    /// Read and parse a JSON snapshot from disk.
    pub fn load_json(path: &Path) -> Result<Self, CorpusError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CorpusError::Io(format!("{}: {e}", path.display())))?;
        let snapshot: CorpusSnapshot =
            serde_json::from_str(&raw).map_err(|e| CorpusError::Parse(e.to_string()))?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn insert_match(&mut self, m: Match) -> Result<(), CorpusError> {
        if self.matches.contains_key(&m.id) {
            return Err(CorpusError::DuplicateMatch(m.id.0));
        }
        self.matches.insert(m.id.clone(), m);
        Ok(())
    }

    /// Add a prediction. It must reference a known match of the same league.
    pub fn insert_prediction(&mut self, p: Prediction) -> Result<(), CorpusError> {
        p.validate()?;
        let m = self
            .matches
            .get(&p.match_id)
            .ok_or_else(|| CorpusError::UnknownMatch(p.match_id.0.clone()))?;
        if m.league != p.league {
            return Err(CorpusError::LeagueMismatch {
                prediction: p.league.to_string(),
                scheduled: m.league.to_string(),
            });
        }
        self.predictions.push(p);
        Ok(())
    }

    /// Records dropped while loading a snapshot.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn prediction_count(&self) -> usize {
        self.predictions.len()
    }

    /// Leagues with at least one match, in catalogue order.
    pub fn leagues(&self) -> Vec<League> {
        let mut leagues: Vec<League> = self.matches.values().map(|m| m.league).collect();
        leagues.sort();
        leagues.dedup();
        leagues
    }
}

impl PredictionCorpus for MemoryCorpus {
    fn league_predictions(
        &self,
        league: League,
        window: &AnalysisWindow,
    ) -> Result<Vec<PredictionWithMatchData>, CorpusError> {
        Ok(self
            .predictions
            .iter()
            .filter(|p| p.league == league)
            .filter_map(|p| {
                let m = self.matches.get(&p.match_id)?;
                window.contains(m.match_date).then(|| PredictionWithMatchData {
                    prediction: p.clone(),
                    match_date: m.match_date,
                })
            })
            .collect())
    }

    fn ordered_matches(
        &self,
        league: League,
        window: &AnalysisWindow,
    ) -> Result<Vec<ScheduledMatch>, CorpusError> {
        let mut ordered: Vec<ScheduledMatch> = self
            .matches
            .values()
            .filter(|m| m.league == league && window.contains(m.match_date))
            .map(Match::scheduled)
            .collect();
        ordered.sort_by(|a, b| {
            a.match_date
                .cmp(&b.match_date)
                .then_with(|| a.match_id.cmp(&b.match_id))
        });
        Ok(ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;
    use crate::types::ProbabilityChoice;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, d, 18, 0, 0).unwrap()
    }

    fn match_record(id: &str, league: &str, d: u32) -> MatchRecord {
        MatchRecord {
            id: id.to_string(),
            league: league.to_string(),
            scheduled_date: day(d),
            home_team: "Home".to_string(),
            away_team: "Away".to_string(),
            home_score: None,
            away_score: None,
            is_complete: false,
        }
    }

    fn prediction_record(uid: u32, match_id: &str, league: &str, choice: &str, p: f64) -> PredictionRecord {
        PredictionRecord {
            participant_id: uid,
            match_id: match_id.to_string(),
            league: league.to_string(),
            chosen_outcome: choice.to_string(),
            probability: p,
            submitted_at: None,
        }
    }

    fn sample_snapshot() -> CorpusSnapshot {
        CorpusSnapshot {
            matches: vec![
                match_record("m3", "EPL", 20),
                match_record("m1", "EPL", 2),
                match_record("m2", "EPL", 10),
                match_record("n1", "NBA", 5),
            ],
            predictions: vec![
                prediction_record(1, "m1", "EPL", "HomeTeam", 0.6),
                prediction_record(2, "m1", "EPL", "AwayTeam", 0.4),
                prediction_record(1, "m3", "EPL", "Draw", 0.3),
                prediction_record(3, "n1", "NBA", "HomeTeam", 0.55),
            ],
        }
    }

    // --- AnalysisWindow ---

    #[test]
    fn window_is_half_open() {
        let w = AnalysisWindow::new(day(1), day(10)).unwrap();
        assert!(w.contains(day(1)));
        assert!(w.contains(day(9)));
        assert!(!w.contains(day(10)));
    }

    #[test]
    fn window_rejects_inverted_bounds() {
        assert!(matches!(
            AnalysisWindow::new(day(10), day(1)),
            Err(CorpusError::InvalidWindow { .. })
        ));
        assert!(AnalysisWindow::new(day(1), day(1)).is_err());
    }

    #[test]
    fn trailing_window_spans_days() {
        let w = AnalysisWindow::trailing(day(15), 7).unwrap();
        assert_eq!(w.start, day(8));
        assert!(w.contains(day(8)));
        assert!(!w.contains(day(15)));
    }

    #[test]
    fn trailing_window_past_earliest_date_is_an_error() {
        assert!(matches!(
            AnalysisWindow::trailing(day(0), u32::MAX),
            Err(CorpusError::InvalidWindow { .. })
        ));
        assert!(AnalysisWindow::trailing(DateTime::<Utc>::MIN_UTC, 1).is_err());
    }

    // --- snapshot loading ---

    #[test]
    fn snapshot_loads_valid_records() {
        let corpus = MemoryCorpus::from_snapshot(sample_snapshot());
        assert_eq!(corpus.match_count(), 4);
        assert_eq!(corpus.prediction_count(), 4);
        assert_eq!(corpus.rejected(), 0);
        assert_eq!(corpus.leagues(), vec![League::Epl, League::Nba]);
    }

    #[test]
    fn unknown_outcome_rejected_at_boundary() {
        let mut snap = sample_snapshot();
        snap.predictions.push(prediction_record(4, "m1", "EPL", "Overtime", 0.5));
        let corpus = MemoryCorpus::from_snapshot(snap);
        assert_eq!(corpus.rejected(), 1);
        assert_eq!(corpus.prediction_count(), 4);

        let err = Prediction::try_from(prediction_record(4, "m1", "EPL", "Overtime", 0.5)).unwrap_err();
        assert_eq!(err, CorpusError::Domain(DomainError::UnknownOutcome("Overtime".into())));
    }

    #[test]
    fn boundary_probabilities_rejected() {
        let mut snap = sample_snapshot();
        snap.predictions.push(prediction_record(5, "m1", "EPL", "HomeTeam", 0.0));
        snap.predictions.push(prediction_record(6, "m1", "EPL", "HomeTeam", 1.0));
        let corpus = MemoryCorpus::from_snapshot(snap);
        assert_eq!(corpus.rejected(), 2);
    }

    #[test]
    fn dangling_and_mismatched_predictions_rejected() {
        let mut corpus = MemoryCorpus::from_snapshot(sample_snapshot());
        let dangling = Prediction {
            miner: MinerId(9),
            match_id: MatchId::from("nope"),
            league: League::Epl,
            choice: ProbabilityChoice::HomeTeam,
            probability: 0.5,
            submitted_at: None,
        };
        assert_eq!(
            corpus.insert_prediction(dangling.clone()),
            Err(CorpusError::UnknownMatch("nope".into()))
        );
        let mismatched = Prediction {
            match_id: MatchId::from("n1"),
            ..dangling
        };
        assert!(matches!(
            corpus.insert_prediction(mismatched),
            Err(CorpusError::LeagueMismatch { .. })
        ));
    }

    #[test]
    fn duplicate_match_rejected() {
        let mut snap = sample_snapshot();
        snap.matches.push(match_record("m1", "EPL", 3));
        let corpus = MemoryCorpus::from_snapshot(snap);
        assert_eq!(corpus.rejected(), 1);
        assert_eq!(corpus.match_count(), 4);
    }

    #[test]
    fn load_json_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, serde_json::to_string(&sample_snapshot()).unwrap()).unwrap();
        let corpus = MemoryCorpus::load_json(&path).unwrap();
        assert_eq!(corpus.prediction_count(), 4);
    }

    #[test]
    fn load_json_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(MemoryCorpus::load_json(&missing), Err(CorpusError::Io(_))));

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "{ not json").unwrap();
        assert!(matches!(MemoryCorpus::load_json(&garbage), Err(CorpusError::Parse(_))));
    }

    // --- PredictionCorpus ---

    #[test]
    fn ordered_matches_sorted_by_date() {
        let corpus = MemoryCorpus::from_snapshot(sample_snapshot());
        let ordered = corpus
            .ordered_matches(League::Epl, &AnalysisWindow::unbounded())
            .unwrap();
        let ids: Vec<&str> = ordered.iter().map(|m| m.match_id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn window_filters_matches_and_predictions() {
        let corpus = MemoryCorpus::from_snapshot(sample_snapshot());
        let window = AnalysisWindow::new(day(1), day(15)).unwrap();
        let ordered = corpus.ordered_matches(League::Epl, &window).unwrap();
        assert_eq!(ordered.len(), 2);
        let preds = corpus.league_predictions(League::Epl, &window).unwrap();
        assert_eq!(preds.len(), 2);
        assert!(preds.iter().all(|p| p.prediction.match_id.as_str() == "m1"));
        assert!(preds.iter().all(|p| p.match_date == day(2)));
    }

    #[test]
    fn other_leagues_excluded() {
        let corpus = MemoryCorpus::from_snapshot(sample_snapshot());
        let preds = corpus
            .league_predictions(League::Nba, &AnalysisWindow::unbounded())
            .unwrap();
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].prediction.miner, MinerId(3));
        assert!(corpus
            .league_predictions(League::Nfl, &AnalysisWindow::unbounded())
            .unwrap()
            .is_empty());
    }
}
