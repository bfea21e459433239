//! Threshold rules turning relationships into penalty sets.

use std::collections::BTreeSet;

use copyguard_core::config::DetectionConfig;
use copyguard_core::types::MinerId;
use serde::Serialize;

use crate::relationship::PairwiseRelationship;

/// Classification of a single relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Enough exact agreements overall; both sides go into both sets.
    ExactMatch,
    /// A long enough run of consecutive exact agreements.
    Consecutive,
    Clear,
}

impl Verdict {
    pub fn penalizes(&self) -> bool {
        !matches!(self, Self::Clear)
    }
}

/// `to_penalize` is always a superset of `exact_match_penalized`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PenaltySets {
    pub to_penalize: BTreeSet<MinerId>,
    pub exact_match_penalized: BTreeSet<MinerId>,
}

#[derive(Debug, Clone, Copy)]
pub struct PenaltyClassifier {
    exact_threshold: usize,
    consecutive_threshold: usize,
}

impl PenaltyClassifier {
    pub fn new(exact_threshold: u32, consecutive_threshold: u32) -> Self {
        Self {
            exact_threshold: exact_threshold as usize,
            consecutive_threshold: consecutive_threshold as usize,
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(
            config.exact_match_predictions_threshold,
            config.suspicious_consecutive_matches_threshold,
        )
    }

    pub fn verdict(&self, relationship: &PairwiseRelationship) -> Verdict {
        if relationship.num_exact_predictions >= self.exact_threshold {
            Verdict::ExactMatch
        } else if relationship.consecutive_patterns.is_some()
            && relationship.max_consecutive() >= self.consecutive_threshold
        {
            Verdict::Consecutive
        } else {
            Verdict::Clear
        }
    }

    pub fn classify<'a, I>(&self, relationships: I) -> PenaltySets
    where
        I: IntoIterator<Item = &'a PairwiseRelationship>,
    {
        let mut sets = PenaltySets::default();
        for rel in relationships {
            let miners = [rel.miners.first(), rel.miners.second()];
            match self.verdict(rel) {
                Verdict::ExactMatch => {
                    sets.to_penalize.extend(miners);
                    sets.exact_match_penalized.extend(miners);
                }
                Verdict::Consecutive => sets.to_penalize.extend(miners),
                Verdict::Clear => {}
            }
        }
        sets
    }
}
