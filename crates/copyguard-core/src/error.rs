//! Error types for Copyguard.
use thiserror::Error;

/// Inputs or numeric states outside the domain a computation is defined on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("odds out of domain: {0} (must be > 1)")] Odds(f64),
    #[error("probability out of domain: {0} (must be in (0, 1))")] Probability(f64),
    #[error("unknown outcome: {0}")] UnknownOutcome(String),
    #[error("unknown league: {0}")] UnknownLeague(String),
    #[error("unknown band side: {0}")] UnknownSide(String),
    #[error("missing {0} odds")] MissingOdds(&'static str),
    #[error("invalid search interval: [{lower}, {upper}]")] Interval { lower: f64, upper: f64 },
    #[error("optimizer did not converge within {evaluations} evaluations")] NoConvergence { evaluations: usize },
    #[error("non-finite objective value at x={x}")] NonFinite { x: f64 },
    #[error("empty band [{left}, {right}]")] EmptyBand { left: f64, right: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorpusError {
    #[error("io: {0}")] Io(String),
    #[error("parse: {0}")] Parse(String),
    #[error("duplicate match: {0}")] DuplicateMatch(String),
    #[error("prediction references unknown match: {0}")] UnknownMatch(String),
    #[error("prediction league {prediction} does not match match league {scheduled}")] LeagueMismatch { prediction: String, scheduled: String },
    #[error("invalid window: start {start} is not before end {end}")] InvalidWindow { start: String, end: String },
    #[error(transparent)] Domain(#[from] DomainError),
}

/// Failure confined to a single pairwise relationship.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("malformed history entry for match {match_id}: {reason}")] MalformedEntry { match_id: String, reason: String },
    #[error("relationship has no shared matches")] NoSharedMatches,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be >= 1, got {value}")] Threshold { name: &'static str, value: u32 },
    #[error("{name} must be finite and > 0, got {value}")] NonPositive { name: &'static str, value: f64 },
    #[error("{name} must be in [0, 1], got {value}")] Rate { name: &'static str, value: f64 },
    #[error("{name} must satisfy 0 < left <= right < 1, got [{left}, {right}]")] Band { name: &'static str, left: f64, right: f64 },
    #[error("{name} must be non-zero")] Zero { name: &'static str },
}

#[derive(Error, Debug)]
pub enum GuardError {
    #[error(transparent)] Domain(#[from] DomainError),
    #[error(transparent)] Corpus(#[from] CorpusError),
    #[error(transparent)] Detection(#[from] DetectionError),
    #[error(transparent)] Config(#[from] ConfigError),
}
