//! League-level copycat detection.
//!
//! [`CopycatDetectionEngine`] runs relationship analysis, streak detection,
//! classification and audit sampling for one league. It holds no state
//! between calls apart from its configuration and random source, so leagues
//! can be analyzed concurrently through a shared reference.

use std::collections::BTreeSet;

use copyguard_core::config::DetectionConfig;
use copyguard_core::corpus::{AnalysisWindow, PredictionCorpus};
use copyguard_core::error::ConfigError;
use copyguard_core::types::{League, MinerId, PredictionWithMatchData, ScheduledMatch};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::audit::{AuditReport, AuditSampler};
use crate::classifier::PenaltyClassifier;
use crate::relationship::{RelationshipAnalysis, RelationshipAnalyzer};
use crate::streak::StreakDetector;

/// Result of analyzing one league.
///
/// `suspicious ⊇ to_penalize ⊇ exact_match_penalized`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeagueAnalysis {
    pub league: League,
    pub suspicious: BTreeSet<MinerId>,
    pub to_penalize: BTreeSet<MinerId>,
    pub exact_match_penalized: BTreeSet<MinerId>,
    pub audit: AuditReport,
    pub relationships_analyzed: usize,
    pub relationships_failed: usize,
}

impl LeagueAnalysis {
    /// No penalty signal for the league.
    pub fn empty(league: League) -> Self {
        Self {
            league,
            suspicious: BTreeSet::new(),
            to_penalize: BTreeSet::new(),
            exact_match_penalized: BTreeSet::new(),
            audit: AuditReport::default(),
            relationships_analyzed: 0,
            relationships_failed: 0,
        }
    }

    pub fn sets(&self) -> (&BTreeSet<MinerId>, &BTreeSet<MinerId>, &BTreeSet<MinerId>) {
        (&self.suspicious, &self.to_penalize, &self.exact_match_penalized)
    }

    pub fn into_sets(self) -> (BTreeSet<MinerId>, BTreeSet<MinerId>, BTreeSet<MinerId>) {
        (self.suspicious, self.to_penalize, self.exact_match_penalized)
    }
}

pub struct CopycatDetectionEngine<R = StdRng> {
    config: DetectionConfig,
    analyzer: RelationshipAnalyzer,
    streaks: StreakDetector,
    classifier: PenaltyClassifier,
    sampler: AuditSampler,
    rng: Mutex<R>,
}

impl CopycatDetectionEngine<StdRng> {
    /// Engine whose audit sampling is seeded from OS entropy.
    pub fn new(config: DetectionConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::from_entropy())
    }
}

impl<R: RngCore> CopycatDetectionEngine<R> {
    pub fn with_rng(config: DetectionConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            analyzer: RelationshipAnalyzer::from_config(&config),
            streaks: StreakDetector::new(config.suspicious_consecutive_matches_threshold),
            classifier: PenaltyClassifier::from_config(&config),
            sampler: AuditSampler::from_config(&config),
            config,
            rng: Mutex::new(rng),
        })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Analyze one league's predictions.
    ///
    /// Empty input yields empty sets. Pairs whose computation fails are
    /// logged and left out; the rest of the league is still classified.
    pub fn analyze_league(
        &self,
        league: League,
        predictions: &[PredictionWithMatchData],
        ordered_matches: &[ScheduledMatch],
    ) -> LeagueAnalysis {
        self.analyze_league_excluding(league, predictions, ordered_matches, &BTreeSet::new())
    }

    /// Like [`analyze_league`](Self::analyze_league), with some participants
    /// removed from every relationship.
    pub fn analyze_league_excluding(
        &self,
        league: League,
        predictions: &[PredictionWithMatchData],
        ordered_matches: &[ScheduledMatch],
        excluded: &BTreeSet<MinerId>,
    ) -> LeagueAnalysis {
        info!(
            %league,
            predictions = predictions.len(),
            matches = ordered_matches.len(),
            excluded = excluded.len(),
            "detect: analyzing league"
        );
        if predictions.is_empty() {
            warn!(%league, "detect: no predictions");
            return LeagueAnalysis::empty(league);
        }

        let analysis = self.relationships(league, predictions, ordered_matches, excluded);

        let suspicious: BTreeSet<MinerId> = analysis
            .relationships
            .keys()
            .flat_map(|k| [k.first(), k.second()])
            .collect();
        let sets = self.classifier.classify(analysis.relationships.values());
        let audit = {
            let mut rng = self.rng.lock();
            self.sampler
                .sample(&analysis.relationships, &sets.to_penalize, &mut *rng)
        };

        info!(
            %league,
            pairs = analysis.relationships.len(),
            failed = analysis.failed.len(),
            suspicious = suspicious.len(),
            to_penalize = sets.to_penalize.len(),
            exact_match = sets.exact_match_penalized.len(),
            audited = audit.records.len(),
            "detect: league analyzed"
        );

        LeagueAnalysis {
            league,
            suspicious,
            to_penalize: sets.to_penalize,
            exact_match_penalized: sets.exact_match_penalized,
            audit,
            relationships_analyzed: analysis.relationships.len(),
            relationships_failed: analysis.failed.len(),
        }
    }

    /// Relationships with their consecutive patterns filled in.
    pub fn relationships(
        &self,
        league: League,
        predictions: &[PredictionWithMatchData],
        ordered_matches: &[ScheduledMatch],
        excluded: &BTreeSet<MinerId>,
    ) -> RelationshipAnalysis {
        let mut analysis = self
            .analyzer
            .analyze(league, predictions, ordered_matches, excluded);
        for (key, rel) in analysis.relationships.iter_mut() {
            let patterns = self.streaks.detect(&rel.history);
            if patterns.num_streaks > 0 {
                debug!(
                    %league,
                    pair = %key,
                    max_consecutive = patterns.max_consecutive,
                    num_streaks = patterns.num_streaks,
                    "detect: consecutive exact streaks"
                );
            }
            rel.consecutive_patterns = Some(patterns);
        }
        analysis
    }

    /// Fetch one league from `corpus` and analyze it.
    ///
    /// A corpus failure yields an empty analysis: no penalty signal for this
    /// league this epoch.
    pub fn analyze_corpus<C>(
        &self,
        corpus: &C,
        league: League,
        window: &AnalysisWindow,
        excluded: &BTreeSet<MinerId>,
    ) -> LeagueAnalysis
    where
        C: PredictionCorpus + ?Sized,
    {
        let fetched = corpus
            .league_predictions(league, window)
            .and_then(|p| Ok((p, corpus.ordered_matches(league, window)?)));
        match fetched {
            Ok((predictions, ordered)) => {
                self.analyze_league_excluding(league, &predictions, &ordered, excluded)
            }
            Err(e) => {
                error!(%league, error = %e, "detect: corpus unavailable, no signal this epoch");
                LeagueAnalysis::empty(league)
            }
        }
    }
}

impl<R> std::fmt::Debug for CopycatDetectionEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopycatDetectionEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
