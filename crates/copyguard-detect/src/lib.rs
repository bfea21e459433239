//! # copyguard-detect — Copycat and collusion detection.
//!
//! Decides which participants submitted predictions too similar to be
//! independent, per league and analysis window:
//! - **Relationships**: pairwise histories over shared matches, in match-date
//!   order, with exact-agreement counts.
//! - **Streaks**: runs of consecutive exact agreements within one history.
//! - **Classifier**: threshold rules producing the penalty sets.
//! - **Audit**: randomly sampled, human-readable excerpts of penalized pairs.
//! - **Engine**: orchestration of the above for one league.

pub mod audit;
pub mod classifier;
pub mod engine;
pub mod relationship;
pub mod streak;

pub use audit::{AuditExcerpt, AuditRecord, AuditReport, AuditSampler};
pub use classifier::{PenaltyClassifier, PenaltySets, Verdict};
pub use engine::{CopycatDetectionEngine, LeagueAnalysis};
pub use relationship::{
    HistoryEntry, PairKey, PairwiseRelationship, RelationshipAnalysis, RelationshipAnalyzer,
};
pub use streak::{ConsecutivePatterns, StreakDetail, StreakDetector};
