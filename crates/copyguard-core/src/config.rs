//! Tuning configuration for the band generator and the detection engine.
//!
//! Both structs are plain values threaded into constructors. They
//! deserialize with `#[serde(default)]`, so a config file only needs to name
//! the fields it overrides.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ConfigError;

/// How two predictions on the same match are compared when deciding whether
/// they are an exact match.
///
/// The raw signed and absolute difference between the two attached
/// probabilities are recorded under every policy; only the `exact` flag
/// differs.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeComparison {
    /// Exact only when both chose the same outcome and the probabilities agree.
    #[default]
    SameChoice,
    /// Exact whenever the probabilities agree, whatever outcome each chose.
    Raw,
    /// Away probabilities are mapped to home-win space (`1 - p`) before
    /// comparing. A draw only compares against a draw.
    HomeReference,
}

/// Thresholds and sampling for copycat detection.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    /// Exact entries at which both participants of a pair are penalized.
    pub exact_match_predictions_threshold: u32,
    /// Consecutive exact matches at which both participants are penalized.
    pub suspicious_consecutive_matches_threshold: u32,
    /// Absolute difference below which two probabilities count as equal.
    pub exact_match_epsilon: f64,
    /// Probability that a qualifying penalized relationship is audited.
    pub audit_sample_rate: f64,
    /// Entries shown per audit excerpt.
    pub audit_excerpt_len: usize,
    pub outcome_comparison: OutcomeComparison,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            exact_match_predictions_threshold: EXACT_MATCH_PREDICTIONS_THRESHOLD,
            suspicious_consecutive_matches_threshold: SUSPICIOUS_CONSECUTIVE_MATCHES_THRESHOLD,
            exact_match_epsilon: EXACT_MATCH_EPSILON,
            audit_sample_rate: AUDIT_SAMPLE_RATE,
            audit_excerpt_len: AUDIT_EXCERPT_LEN,
            outcome_comparison: OutcomeComparison::default(),
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exact_match_predictions_threshold == 0 {
            return Err(ConfigError::Threshold {
                name: "exact_match_predictions_threshold",
                value: 0,
            });
        }
        if self.suspicious_consecutive_matches_threshold == 0 {
            return Err(ConfigError::Threshold {
                name: "suspicious_consecutive_matches_threshold",
                value: 0,
            });
        }
        positive("exact_match_epsilon", self.exact_match_epsilon)?;
        if !(0.0..=1.0).contains(&self.audit_sample_rate) {
            return Err(ConfigError::Rate {
                name: "audit_sample_rate",
                value: self.audit_sample_rate,
            });
        }
        Ok(())
    }
}

/// Shape constants of the plateaued-Gaussian scoring curve.
///
/// Plateau half-width is `a * exp(-b * (odds - 1)) + c`; outside the plateau
/// the curve decays as `exp(-diff^2 / (2 * t * odds))`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct CurveShape {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub t: f64,
}

impl Default for CurveShape {
    fn default() -> Self {
        Self {
            a: CURVE_A,
            b: CURVE_B,
            c: CURVE_C,
            t: CURVE_T,
        }
    }
}

/// Clamp, fallback and solver settings for band generation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BandConfig {
    pub curve: CurveShape,
    pub band_ceiling: f64,
    pub min_band_width: f64,
    pub low_left_floor: f64,
    pub low_confidence_band: (f64, f64),
    pub fallback_band: (f64, f64),
    /// Grid steps per unit probability.
    pub resolution: u32,
    pub solver_tolerance: f64,
    pub solver_max_evaluations: usize,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            curve: CurveShape::default(),
            band_ceiling: BAND_CEILING,
            min_band_width: MIN_BAND_WIDTH,
            low_left_floor: LOW_LEFT_FLOOR,
            low_confidence_band: LOW_CONFIDENCE_BAND,
            fallback_band: FALLBACK_BAND,
            resolution: PROBABILITY_RESOLUTION,
            solver_tolerance: SOLVER_TOLERANCE,
            solver_max_evaluations: SOLVER_MAX_EVALUATIONS,
        }
    }
}

impl BandConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("curve.t", self.curve.t)?;
        if !self.curve.a.is_finite() || !self.curve.b.is_finite() || !self.curve.c.is_finite() {
            return Err(ConfigError::NonPositive {
                name: "curve",
                value: f64::NAN,
            });
        }
        unit_band("low_confidence_band", self.low_confidence_band)?;
        unit_band("fallback_band", self.fallback_band)?;
        if !(self.band_ceiling > 0.0 && self.band_ceiling < 1.0) {
            return Err(ConfigError::Rate {
                name: "band_ceiling",
                value: self.band_ceiling,
            });
        }
        if !(0.0..1.0).contains(&self.min_band_width) {
            return Err(ConfigError::Rate {
                name: "min_band_width",
                value: self.min_band_width,
            });
        }
        if !(0.0..1.0).contains(&self.low_left_floor) {
            return Err(ConfigError::Rate {
                name: "low_left_floor",
                value: self.low_left_floor,
            });
        }
        if self.resolution == 0 {
            return Err(ConfigError::Zero { name: "resolution" });
        }
        positive("solver_tolerance", self.solver_tolerance)?;
        if self.solver_max_evaluations == 0 {
            return Err(ConfigError::Zero {
                name: "solver_max_evaluations",
            });
        }
        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

fn unit_band(name: &'static str, (left, right): (f64, f64)) -> Result<(), ConfigError> {
    if left > 0.0 && left <= right && right < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::Band { name, left, right })
    }
}
