//! Sampled audit records for penalized relationships.
//!
//! Reporting only: nothing here feeds back into classification.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use copyguard_core::config::DetectionConfig;
use copyguard_core::types::MinerId;
use rand::{Rng, RngCore};
use serde::Serialize;
use tracing::info;

use crate::relationship::{HistoryEntry, PairKey, PairwiseRelationship};

/// Representative entries of one sampled relationship.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditExcerpt {
    /// Leading entries of every recorded streak.
    Streaks {
        num_streaks: usize,
        max_consecutive: usize,
        streaks: Vec<Vec<HistoryEntry>>,
    },
    /// Leading entries of the full history.
    History { entries: Vec<HistoryEntry> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub miners: PairKey,
    pub num_matches: usize,
    pub num_predictions: usize,
    pub predictions_per_match: f64,
    pub num_exact_predictions: usize,
    pub excerpt: AuditExcerpt,
}

impl fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "miners {}: matches={} predictions={} per_match={:.2} exact={}",
            self.miners,
            self.num_matches,
            self.num_predictions,
            self.predictions_per_match,
            self.num_exact_predictions,
        )?;
        match &self.excerpt {
            AuditExcerpt::Streaks {
                num_streaks,
                max_consecutive,
                streaks,
            } => {
                write!(f, "\n  streaks={num_streaks} max={max_consecutive}")?;
                for (i, streak) in streaks.iter().enumerate() {
                    write!(f, "\n  streak {}:", i + 1)?;
                    for entry in streak {
                        write!(f, "\n    {entry}")?;
                    }
                }
            }
            AuditExcerpt::History { entries } => {
                for entry in entries {
                    write!(f, "\n  {entry}")?;
                }
            }
        }
        Ok(())
    }
}

/// Sampled records plus difference statistics over penalized histories.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditReport {
    pub records: Vec<AuditRecord>,
    /// Mean of the non-zero absolute differences; `None` when there are none.
    pub mean_abs_difference: Option<f64>,
    pub greatest_abs_difference: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct AuditSampler {
    sample_rate: f64,
    excerpt_len: usize,
    exact_threshold: usize,
}

impl AuditSampler {
    pub fn new(sample_rate: f64, excerpt_len: usize, exact_threshold: u32) -> Self {
        Self {
            sample_rate: sample_rate.clamp(0.0, 1.0),
            excerpt_len,
            exact_threshold: exact_threshold as usize,
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(
            config.audit_sample_rate,
            config.audit_excerpt_len,
            config.exact_match_predictions_threshold,
        )
    }

    /// Build the report over relationships touching a penalized participant.
    ///
    /// Only relationships with enough exact entries or a recorded streak are
    /// eligible for sampling; each eligible one is kept with probability
    /// `sample_rate`.
    pub fn sample<R: RngCore>(
        &self,
        relationships: &BTreeMap<PairKey, PairwiseRelationship>,
        to_penalize: &BTreeSet<MinerId>,
        rng: &mut R,
    ) -> AuditReport {
        let mut report = AuditReport::default();
        let mut sum = 0.0f64;
        let mut count = 0usize;

        let penalized = relationships.values().filter(|rel| {
            to_penalize.contains(&rel.miners.first()) || to_penalize.contains(&rel.miners.second())
        });
        for rel in penalized {
            for entry in &rel.history {
                if entry.absolute_difference > 0.0 {
                    sum += entry.absolute_difference;
                    count += 1;
                    report.greatest_abs_difference =
                        report.greatest_abs_difference.max(entry.absolute_difference);
                }
            }

            let eligible = rel.num_exact_predictions >= self.exact_threshold || rel.has_streaks();
            if eligible && rng.gen_bool(self.sample_rate) {
                let record = self.record(rel);
                info!(pair = %rel.miners, "audit: {record}");
                report.records.push(record);
            }
        }

        if count > 0 {
            report.mean_abs_difference = Some(sum / count as f64);
        }
        report
    }

    fn record(&self, rel: &PairwiseRelationship) -> AuditRecord {
        let excerpt = match &rel.consecutive_patterns {
            Some(patterns) if !patterns.streak_details.is_empty() => AuditExcerpt::Streaks {
                num_streaks: patterns.num_streaks,
                max_consecutive: patterns.max_consecutive,
                streaks: patterns
                    .streak_details
                    .iter()
                    .map(|s| s.entries.iter().take(self.excerpt_len).cloned().collect())
                    .collect(),
            },
            _ => AuditExcerpt::History {
                entries: rel.history.iter().take(self.excerpt_len).cloned().collect(),
            },
        };
        AuditRecord {
            miners: rel.miners,
            num_matches: rel.num_matches,
            num_predictions: rel.num_predictions,
            predictions_per_match: rel.predictions_per_match,
            num_exact_predictions: rel.num_exact_predictions,
            excerpt,
        }
    }
}
