//! Plateaued-Gaussian scoring curve.
//!
//! `y(odds, prob) = f * (odds - 1/prob)` where the difference is measured in
//! odds space. Inside a plateau of half-width
//! `w = a * exp(-b * (odds - 1)) + c` the factor `f` is exactly 1; outside it
//! decays as `exp(-diff^2 / (2 * t * odds))`.

use copyguard_core::config::CurveShape;
use copyguard_core::error::DomainError;
use copyguard_core::types::{check_odds, check_probability};

/// Pure, stateless scoring curve parameterized by its shape constants.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoringCurve {
    shape: CurveShape,
}

impl ScoringCurve {
    pub fn new(shape: CurveShape) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> &CurveShape {
        &self.shape
    }

    /// Plateau half-width (in odds units) at the given odds.
    pub fn plateau_half_width(&self, odds: f64) -> f64 {
        self.shape.a * (-self.shape.b * (odds - 1.0)).exp() + self.shape.c
    }

    /// Multiplicative factor applied to `odds - 1/prob`: 1 on the plateau,
    /// Gaussian decay outside it. Always in `[0, 1]`.
    pub fn decay_factor(&self, odds: f64, prob: f64) -> Result<f64, DomainError> {
        check_odds(odds)?;
        check_probability(prob)?;
        Ok(self.factor_unchecked(odds, (odds - 1.0 / prob).abs()))
    }

    /// Evaluate `y(odds, prob)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use copyguard_band::ScoringCurve;
    ///
    /// let curve = ScoringCurve::default();
    /// // At the implied probability the odds-space difference vanishes.
    /// assert!(curve.y(4.0, 0.25).unwrap().abs() < 1e-12);
    /// // Below the implied probability the curve is negative.
    /// assert!(curve.y(4.0, 0.2).unwrap() < 0.0);
    /// assert!(curve.y(1.0, 0.5).is_err());
    /// ```
    pub fn y(&self, odds: f64, prob: f64) -> Result<f64, DomainError> {
        check_odds(odds)?;
        check_probability(prob)?;
        let signed = odds - 1.0 / prob;
        Ok(self.factor_unchecked(odds, signed.abs()) * signed)
    }

    fn factor_unchecked(&self, odds: f64, diff: f64) -> f64 {
        if diff <= self.plateau_half_width(odds) {
            1.0
        } else {
            (-(diff * diff) / (2.0 * self.shape.t * odds)).exp()
        }
    }
}
