//! # copyguard-band — Odds-to-probability band generation.
//!
//! Turns a bookmaker's decimal odds for one outcome into a plausible,
//! randomized probability that tracks the implied probability without
//! reproducing it:
//! - **Scoring curve**: plateaued-Gaussian surface `y(odds, prob)` around the
//!   odds-implied probability.
//! - **Extrema solver**: bounded Brent minimization of `y` below and above the
//!   implied probability.
//! - **Band generator**: derives a sampling interval from the extrema, with
//!   clamp and fallback rules, and draws a four-decimal probability from it.
//! - **Outcome picking**: chooses which outcome of a full odds line to predict.

pub mod band;
pub mod curve;
pub mod extrema;
pub mod pick;

pub use band::{Band, BandGenerator, ProbabilityDraw};
pub use curve::ScoringCurve;
pub use extrema::{Extrema, Extremum, ExtremaSolver};
pub use pick::{MatchOdds, OddsPick, PredictionDraw};
