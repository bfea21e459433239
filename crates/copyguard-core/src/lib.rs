//! # copyguard-core
//! Foundation types, configuration and corpus traits shared by the band
//! generator and the copycat detection engine.

pub mod config;
pub mod constants;
pub mod corpus;
pub mod error;
pub mod types;

pub use config::{BandConfig, CurveShape, DetectionConfig, OutcomeComparison};
pub use corpus::{AnalysisWindow, CorpusSnapshot, MemoryCorpus, PredictionCorpus};
pub use error::{ConfigError, CorpusError, DetectionError, DomainError, GuardError};
pub use types::{
    BandSide, League, Match, MatchId, MinerId, Prediction, PredictionWithMatchData,
    ProbabilityChoice, ScheduledMatch, Sport,
};
