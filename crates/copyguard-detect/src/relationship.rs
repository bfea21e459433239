//! Pairwise relationships between participants.
//!
//! For every unordered pair of participants that predicted at least one
//! common match, a [`PairwiseRelationship`] collects one [`HistoryEntry`]
//! per paired prediction. Entries follow the chronological match order, so
//! the history can be scanned for streaks directly.
//!
//! When a participant submitted several predictions for one match, both
//! participants' predictions are ordered by submission time and zipped; the
//! surplus of the longer list is ignored.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use copyguard_core::config::{DetectionConfig, OutcomeComparison};
use copyguard_core::error::DetectionError;
use copyguard_core::types::{
    League, MatchId, MinerId, Prediction, PredictionWithMatchData, ProbabilityChoice,
    ScheduledMatch, check_probability,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::streak::ConsecutivePatterns;

/// Unordered pair of participants, stored with the smaller id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PairKey(MinerId, MinerId);

impl PairKey {
    pub fn new(a: MinerId, b: MinerId) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }

    pub fn first(&self) -> MinerId {
        self.0
    }

    pub fn second(&self) -> MinerId {
        self.1
    }

    pub fn contains(&self, miner: MinerId) -> bool {
        self.0 == miner || self.1 == miner
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.0, self.1)
    }
}

/// One paired prediction on a shared match.
///
/// `prob1`/`choice1` belong to the pair's first (smaller) id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub match_id: MatchId,
    pub match_date: DateTime<Utc>,
    pub choice1: ProbabilityChoice,
    pub choice2: ProbabilityChoice,
    pub prob1: f64,
    pub prob2: f64,
    /// `prob1 - prob2`, on the raw chosen-outcome probabilities.
    pub difference: f64,
    pub absolute_difference: f64,
    /// Exact agreement under the configured [`OutcomeComparison`].
    pub exact: bool,
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "match {} ({}): {}/{} prob1={:.4} prob2={:.4} diff={:+.6} abs={:.6}",
            self.match_id,
            self.match_date.format("%Y-%m-%d %H:%M"),
            self.choice1,
            self.choice2,
            self.prob1,
            self.prob2,
            self.difference,
            self.absolute_difference,
        )
    }
}

/// Similarity statistics for one pair over the analyzed window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairwiseRelationship {
    pub miners: PairKey,
    pub history: Vec<HistoryEntry>,
    pub num_matches: usize,
    pub num_predictions: usize,
    pub predictions_per_match: f64,
    pub num_exact_predictions: usize,
    pub num_matches_with_exact: usize,
    /// Filled in by streak detection.
    pub consecutive_patterns: Option<ConsecutivePatterns>,
}

impl PairwiseRelationship {
    pub fn max_consecutive(&self) -> usize {
        self.consecutive_patterns
            .as_ref()
            .map_or(0, |p| p.max_consecutive)
    }

    pub fn has_streaks(&self) -> bool {
        self.consecutive_patterns
            .as_ref()
            .is_some_and(|p| !p.streak_details.is_empty())
    }
}

/// Output of one [`RelationshipAnalyzer::analyze`] pass.
#[derive(Debug, Clone, Default)]
pub struct RelationshipAnalysis {
    pub relationships: BTreeMap<PairKey, PairwiseRelationship>,
    /// Pairs whose computation failed; they are absent from `relationships`.
    pub failed: BTreeMap<PairKey, DetectionError>,
    /// Predictions skipped for belonging to another league or to a match
    /// outside the ordered match list.
    pub skipped_predictions: usize,
}

impl RelationshipAnalysis {
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }
}

/// Builds pairwise relationships from one league's predictions.
#[derive(Debug, Clone)]
pub struct RelationshipAnalyzer {
    epsilon: f64,
    comparison: OutcomeComparison,
}

#[derive(Default)]
struct PairAccumulator {
    history: Vec<HistoryEntry>,
    num_matches: usize,
    num_matches_with_exact: usize,
}

impl RelationshipAnalyzer {
    pub fn new(epsilon: f64, comparison: OutcomeComparison) -> Self {
        Self { epsilon, comparison }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.exact_match_epsilon, config.outcome_comparison)
    }

    /// Build every relationship for `league`.
    ///
    /// `ordered_matches` fixes the history order and bounds which matches
    /// count at all. Participants in `excluded` never appear in a pair.
    pub fn analyze(
        &self,
        league: League,
        predictions: &[PredictionWithMatchData],
        ordered_matches: &[ScheduledMatch],
        excluded: &BTreeSet<MinerId>,
    ) -> RelationshipAnalysis {
        let mut schedule: Vec<&ScheduledMatch> = ordered_matches.iter().collect();
        schedule.sort_by(|a, b| {
            a.match_date
                .cmp(&b.match_date)
                .then_with(|| a.match_id.cmp(&b.match_id))
        });
        schedule.dedup_by(|a, b| a.match_id == b.match_id);

        let position: HashMap<&MatchId, usize> = schedule
            .iter()
            .enumerate()
            .map(|(i, m)| (&m.match_id, i))
            .collect();

        // match position -> miner -> that miner's predictions on the match
        let mut by_match: Vec<BTreeMap<MinerId, Vec<&Prediction>>> =
            vec![BTreeMap::new(); schedule.len()];
        let mut skipped = 0usize;
        for p in predictions.iter().map(|p| &p.prediction) {
            if excluded.contains(&p.miner) {
                continue;
            }
            match position.get(&p.match_id) {
                Some(&i) if p.league == league => {
                    by_match[i].entry(p.miner).or_default().push(p)
                }
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!(%league, skipped, "relationships: ignored predictions outside the match list");
        }

        let mut accumulators: BTreeMap<PairKey, PairAccumulator> = BTreeMap::new();
        let mut failed: BTreeMap<PairKey, DetectionError> = BTreeMap::new();

        for (i, miners) in by_match.iter_mut().enumerate() {
            for list in miners.values_mut() {
                list.sort_by(|a, b| {
                    a.submitted_at
                        .cmp(&b.submitted_at)
                        .then_with(|| a.probability.total_cmp(&b.probability))
                        .then_with(|| a.choice.cmp(&b.choice))
                });
            }

            let scheduled = schedule[i];
            let entries: Vec<(&MinerId, &Vec<&Prediction>)> = miners.iter().collect();
            for (a, (miner_a, preds_a)) in entries.iter().enumerate() {
                for (miner_b, preds_b) in &entries[a + 1..] {
                    let key = PairKey::new(**miner_a, **miner_b);
                    if failed.contains_key(&key) {
                        continue;
                    }
                    match self.paired_entries(scheduled, preds_a, preds_b) {
                        Ok(new_entries) => {
                            let acc = accumulators.entry(key).or_default();
                            acc.num_matches += 1;
                            if new_entries.iter().any(|e| e.exact) {
                                acc.num_matches_with_exact += 1;
                            }
                            acc.history.extend(new_entries);
                        }
                        Err(e) => {
                            warn!(%league, pair = %key, error = %e, "relationships: pair excluded");
                            accumulators.remove(&key);
                            failed.insert(key, e);
                        }
                    }
                }
            }
        }

        let mut relationships = BTreeMap::new();
        for (key, acc) in accumulators {
            match finish(key, acc) {
                Ok(rel) => {
                    relationships.insert(key, rel);
                }
                Err(e) => {
                    warn!(%league, pair = %key, error = %e, "relationships: pair excluded");
                    failed.insert(key, e);
                }
            }
        }

        debug!(
            %league,
            pairs = relationships.len(),
            failed = failed.len(),
            "relationships: analyzed"
        );

        RelationshipAnalysis {
            relationships,
            failed,
            skipped_predictions: skipped,
        }
    }

    /// Zip two participants' predictions on one match into history entries.
    fn paired_entries(
        &self,
        scheduled: &ScheduledMatch,
        first: &[&Prediction],
        second: &[&Prediction],
    ) -> Result<Vec<HistoryEntry>, DetectionError> {
        first
            .iter()
            .zip(second)
            .map(|(p1, p2)| self.entry(scheduled, p1, p2))
            .collect()
    }

    fn entry(
        &self,
        scheduled: &ScheduledMatch,
        p1: &Prediction,
        p2: &Prediction,
    ) -> Result<HistoryEntry, DetectionError> {
        for p in [p1, p2] {
            check_probability(p.probability).map_err(|e| DetectionError::MalformedEntry {
                match_id: scheduled.match_id.to_string(),
                reason: format!("miner {}: {e}", p.miner),
            })?;
        }
        let difference = p1.probability - p2.probability;
        let absolute_difference = difference.abs();
        Ok(HistoryEntry {
            match_id: scheduled.match_id.clone(),
            match_date: scheduled.match_date,
            choice1: p1.choice,
            choice2: p2.choice,
            prob1: p1.probability,
            prob2: p2.probability,
            difference,
            absolute_difference,
            exact: self.is_exact(p1, p2),
        })
    }

    /// Exact agreement of two predictions under the comparison policy.
    pub fn is_exact(&self, p1: &Prediction, p2: &Prediction) -> bool {
        let close = |x: f64, y: f64| (x - y).abs() < self.epsilon;
        match self.comparison {
            OutcomeComparison::Raw => close(p1.probability, p2.probability),
            OutcomeComparison::SameChoice => {
                p1.choice == p2.choice && close(p1.probability, p2.probability)
            }
            OutcomeComparison::HomeReference => {
                match (home_space(p1.choice, p1.probability), home_space(p2.choice, p2.probability)) {
                    (Some(x), Some(y)) => close(x, y),
                    (None, None) => close(p1.probability, p2.probability),
                    _ => false,
                }
            }
        }
    }
}

/// Home-win probability for a home/away pick; `None` for a draw.
fn home_space(choice: ProbabilityChoice, p: f64) -> Option<f64> {
    match choice {
        ProbabilityChoice::HomeTeam => Some(p),
        ProbabilityChoice::AwayTeam => Some(1.0 - p),
        ProbabilityChoice::Draw => None,
    }
}

fn finish(key: PairKey, acc: PairAccumulator) -> Result<PairwiseRelationship, DetectionError> {
    if acc.num_matches == 0 || acc.history.is_empty() {
        return Err(DetectionError::NoSharedMatches);
    }
    let num_predictions = acc.history.len();
    let num_exact_predictions = acc.history.iter().filter(|e| e.exact).count();
    Ok(PairwiseRelationship {
        miners: key,
        num_matches: acc.num_matches,
        num_predictions,
        predictions_per_match: num_predictions as f64 / acc.num_matches as f64,
        num_exact_predictions,
        num_matches_with_exact: acc.num_matches_with_exact,
        history: acc.history,
        consecutive_patterns: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn date(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 19, 0, 0).unwrap() + Duration::days(day)
    }

    fn scheduled(id: &str, day: i64) -> ScheduledMatch {
        ScheduledMatch::new(id, date(day))
    }

    fn pred(miner: u32, match_id: &str, day: i64, choice: ProbabilityChoice, p: f64) -> PredictionWithMatchData {
        PredictionWithMatchData {
            prediction: Prediction {
                miner: MinerId(miner),
                match_id: MatchId::from(match_id),
                league: League::Nba,
                choice,
                probability: p,
                submitted_at: None,
            },
            match_date: date(day),
        }
    }

    fn analyzer(comparison: OutcomeComparison) -> RelationshipAnalyzer {
        RelationshipAnalyzer::new(1e-5, comparison)
    }

    fn none() -> BTreeSet<MinerId> {
        BTreeSet::new()
    }

    use ProbabilityChoice::{AwayTeam, Draw, HomeTeam};

    // --- PairKey ---

    #[test]
    fn pair_key_is_unordered() {
        assert_eq!(PairKey::new(MinerId(9), MinerId(2)), PairKey::new(MinerId(2), MinerId(9)));
        assert_eq!(PairKey::new(MinerId(9), MinerId(2)).first(), MinerId(2));
        assert_eq!(PairKey::new(MinerId(9), MinerId(2)).to_string(), "2-9");
    }

    // --- history construction ---

    #[test]
    fn history_follows_match_order_not_input_order() {
        let matches = vec![scheduled("c", 3), scheduled("a", 1), scheduled("b", 2)];
        let preds = vec![
            pred(1, "c", 3, HomeTeam, 0.6),
            pred(2, "c", 3, HomeTeam, 0.6),
            pred(2, "a", 1, HomeTeam, 0.5),
            pred(1, "a", 1, HomeTeam, 0.7),
            pred(1, "b", 2, AwayTeam, 0.4),
            pred(2, "b", 2, AwayTeam, 0.45),
        ];
        let out = analyzer(OutcomeComparison::SameChoice).analyze(League::Nba, &preds, &matches, &none());
        let rel = &out.relationships[&PairKey::new(MinerId(1), MinerId(2))];
        let ids: Vec<&str> = rel.history.iter().map(|e| e.match_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(rel.num_matches, 3);
        assert_eq!(rel.num_exact_predictions, 1);
        assert!((rel.history[0].difference - 0.2).abs() < 1e-12);
        assert!((rel.history[1].absolute_difference - 0.05).abs() < 1e-12);
    }

    #[test]
    fn only_shared_matches_create_relationships() {
        let matches = vec![scheduled("a", 1), scheduled("b", 2)];
        let preds = vec![
            pred(1, "a", 1, HomeTeam, 0.6),
            pred(2, "b", 2, HomeTeam, 0.6),
            pred(3, "a", 1, HomeTeam, 0.6),
        ];
        let out = analyzer(OutcomeComparison::SameChoice).analyze(League::Nba, &preds, &matches, &none());
        assert_eq!(out.relationships.len(), 1);
        assert!(out.relationships.contains_key(&PairKey::new(MinerId(1), MinerId(3))));
    }

    #[test]
    fn excluded_miners_never_appear() {
        let matches = vec![scheduled("a", 1)];
        let preds = vec![
            pred(1, "a", 1, HomeTeam, 0.6),
            pred(2, "a", 1, HomeTeam, 0.6),
            pred(3, "a", 1, HomeTeam, 0.6),
        ];
        let excluded = BTreeSet::from([MinerId(2)]);
        let out = analyzer(OutcomeComparison::SameChoice).analyze(League::Nba, &preds, &matches, &excluded);
        assert_eq!(out.relationships.len(), 1);
        assert!(out.relationships.keys().all(|k| !k.contains(MinerId(2))));
    }

    #[test]
    fn predictions_outside_match_list_or_league_ignored() {
        let matches = vec![scheduled("a", 1)];
        let mut foreign = pred(2, "a", 1, HomeTeam, 0.6);
        foreign.prediction.league = League::Mlb;
        let preds = vec![
            pred(1, "a", 1, HomeTeam, 0.6),
            foreign,
            pred(3, "zz", 9, HomeTeam, 0.6),
        ];
        let out = analyzer(OutcomeComparison::SameChoice).analyze(League::Nba, &preds, &matches, &none());
        assert!(out.is_empty());
        assert_eq!(out.skipped_predictions, 2);
    }

    #[test]
    fn multiple_predictions_zip_in_submission_order() {
        let matches = vec![scheduled("a", 1)];
        let mut preds = Vec::new();
        for (miner, hour, p) in [(1, 2, 0.61), (1, 1, 0.60), (1, 3, 0.62), (2, 1, 0.60), (2, 2, 0.61)] {
            let mut entry = pred(miner, "a", 1, HomeTeam, p);
            entry.prediction.submitted_at = Some(date(0) + Duration::hours(hour));
            preds.push(entry);
        }
        let out = analyzer(OutcomeComparison::SameChoice).analyze(League::Nba, &preds, &matches, &none());
        let rel = &out.relationships[&PairKey::new(MinerId(1), MinerId(2))];
        assert_eq!(rel.num_matches, 1);
        assert_eq!(rel.num_predictions, 2);
        assert_eq!(rel.predictions_per_match, 2.0);
        assert_eq!(rel.num_exact_predictions, 2);
        assert_eq!(rel.num_matches_with_exact, 1);
    }

    #[test]
    fn malformed_entry_poisons_only_its_pair() {
        let matches = vec![scheduled("a", 1), scheduled("b", 2)];
        let preds = vec![
            pred(1, "a", 1, HomeTeam, 0.6),
            pred(2, "a", 1, HomeTeam, 0.6),
            pred(3, "a", 1, HomeTeam, 0.6),
            pred(1, "b", 2, HomeTeam, f64::NAN),
            pred(2, "b", 2, HomeTeam, 0.5),
        ];
        let out = analyzer(OutcomeComparison::SameChoice).analyze(League::Nba, &preds, &matches, &none());
        let bad = PairKey::new(MinerId(1), MinerId(2));
        assert!(!out.relationships.contains_key(&bad));
        assert!(matches!(out.failed[&bad], DetectionError::MalformedEntry { .. }));
        assert!(out.relationships.contains_key(&PairKey::new(MinerId(1), MinerId(3))));
        assert!(out.relationships.contains_key(&PairKey::new(MinerId(2), MinerId(3))));
    }

    // --- outcome comparison ---

    fn bare(choice: ProbabilityChoice, p: f64) -> Prediction {
        pred(1, "a", 1, choice, p).prediction
    }

    #[test]
    fn same_choice_requires_matching_outcome() {
        let a = analyzer(OutcomeComparison::SameChoice);
        assert!(a.is_exact(&bare(HomeTeam, 0.6), &bare(HomeTeam, 0.600001)));
        assert!(!a.is_exact(&bare(HomeTeam, 0.6), &bare(AwayTeam, 0.6)));
        assert!(!a.is_exact(&bare(HomeTeam, 0.6), &bare(HomeTeam, 0.61)));
    }

    #[test]
    fn raw_ignores_outcome() {
        let a = analyzer(OutcomeComparison::Raw);
        assert!(a.is_exact(&bare(HomeTeam, 0.6), &bare(AwayTeam, 0.6)));
    }

    #[test]
    fn home_reference_maps_away_picks() {
        let a = analyzer(OutcomeComparison::HomeReference);
        assert!(a.is_exact(&bare(HomeTeam, 0.6), &bare(AwayTeam, 0.4)));
        assert!(!a.is_exact(&bare(HomeTeam, 0.6), &bare(AwayTeam, 0.6)));
        assert!(a.is_exact(&bare(Draw, 0.3), &bare(Draw, 0.3)));
        assert!(!a.is_exact(&bare(Draw, 0.3), &bare(HomeTeam, 0.3)));
    }

    #[test]
    fn raw_difference_recorded_regardless_of_policy() {
        let matches = vec![scheduled("a", 1)];
        let preds = vec![pred(1, "a", 1, HomeTeam, 0.6), pred(2, "a", 1, AwayTeam, 0.4)];
        let out = analyzer(OutcomeComparison::HomeReference).analyze(League::Nba, &preds, &matches, &none());
        let entry = &out.relationships[&PairKey::new(MinerId(1), MinerId(2))].history[0];
        assert!((entry.difference - 0.2).abs() < 1e-12);
        assert!(entry.exact);
    }
}
