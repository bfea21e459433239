//! Sampling bands and randomized probability draws.
//!
//! A band is derived from the curve extrema for the requested side:
//! - **Underdog** (near-implied): `[x_min, x_min + (implied - x_min) / 2]`,
//!   widened to `implied` when no wider than `min_band_width`.
//! - **Favored** (beyond-implied): `[implied + (x_max - implied) / 2,
//!   min(x_max + (1 - x_max) / 2, band_ceiling)]`, collapsing the left edge
//!   to `implied` when the band inverts and replaced by the low-confidence
//!   band when the left edge falls under `low_left_floor`.
//!
//! Probabilities are drawn uniformly from the four-decimal grid inside the
//! band. Any failure along the way yields a [`ProbabilityDraw::Fallback`]
//! drawn from the fixed fallback band instead of an error.

use std::fmt;

use copyguard_core::config::BandConfig;
use copyguard_core::error::{ConfigError, DomainError};
use copyguard_core::types::BandSide;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::Serialize;
use tracing::{debug, warn};

use crate::extrema::{Extrema, ExtremaSolver};

/// Closed sampling interval `[left, right]` with `0 < left <= right < 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Band {
    pub left: f64,
    pub right: f64,
}

impl Band {
    /// Build a band, rejecting inverted or out-of-range edges.
    ///
    /// # Examples
    ///
    /// ```
    /// use copyguard_band::Band;
    ///
    /// assert!(Band::new(0.55, 0.75).is_ok());
    /// assert!(Band::new(0.75, 0.55).is_err());
    /// assert!(Band::new(0.0, 0.5).is_err());
    /// ```
    pub fn new(left: f64, right: f64) -> Result<Self, DomainError> {
        if left.is_finite() && right.is_finite() && left > 0.0 && left <= right && right < 1.0 {
            Ok(Self { left, right })
        } else {
            Err(DomainError::EmptyBand { left, right })
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn contains(&self, p: f64) -> bool {
        self.left <= p && p <= self.right
    }

    /// Inclusive integer grid `[ceil(left * res), floor(right * res)]`.
    ///
    /// Every grid point divided by `resolution` lies inside the band. A band
    /// narrower than one grid step may contain no grid point at all.
    pub fn grid(&self, resolution: u32) -> Result<(u32, u32), DomainError> {
        let res = f64::from(resolution);
        let lo = (self.left * res).ceil();
        let hi = (self.right * res).floor();
        if lo > hi {
            return Err(DomainError::EmptyBand {
                left: self.left,
                right: self.right,
            });
        }
        Ok((lo as u32, hi as u32))
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.4}, {:.4}]", self.left, self.right)
    }
}

/// Outcome of [`BandGenerator::generate_probability`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProbabilityDraw {
    /// Drawn from the band derived for the requested odds and side.
    Sampled { probability: f64, band: Band },
    /// Generation failed; drawn from the fixed fallback band.
    Fallback {
        probability: f64,
        band: Band,
        reason: DomainError,
    },
}

impl ProbabilityDraw {
    pub fn probability(&self) -> f64 {
        match self {
            Self::Sampled { probability, .. } | Self::Fallback { probability, .. } => *probability,
        }
    }

    pub fn band(&self) -> Band {
        match self {
            Self::Sampled { band, .. } | Self::Fallback { band, .. } => *band,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&DomainError> {
        match self {
            Self::Sampled { .. } => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// Derives bands from bookmaker odds and draws probabilities from them.
///
/// The random source is injected and held behind a mutex, so one generator
/// can serve concurrent requests through `&self`.
pub struct BandGenerator<R = StdRng> {
    config: BandConfig,
    solver: ExtremaSolver,
    rng: Mutex<R>,
}

impl BandGenerator<StdRng> {
    /// Generator backed by an OS-seeded CSPRNG.
    pub fn new(config: BandConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::from_entropy())
    }
}

impl<R: RngCore> BandGenerator<R> {
    pub fn with_rng(config: BandConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            solver: ExtremaSolver::from_config(&config),
            config,
            rng: Mutex::new(rng),
        })
    }

    pub fn config(&self) -> &BandConfig {
        &self.config
    }

    pub fn solver(&self) -> &ExtremaSolver {
        &self.solver
    }

    /// Derive the sampling band for one outcome's odds.
    pub fn generate_band(&self, odds: f64, side: BandSide) -> Result<Band, DomainError> {
        let extrema = self.solver.find_extrema(odds)?;
        let band = match side {
            BandSide::Underdog => self.near_implied_band(&extrema)?,
            BandSide::Favored => self.beyond_implied_band(&extrema)?,
        };
        debug!(odds, %side, %band, implied = extrema.implied, "band: derived");
        Ok(band)
    }

    /// Band between the curve minimum and the implied probability.
    pub fn near_implied_band(&self, extrema: &Extrema) -> Result<Band, DomainError> {
        let left = extrema.min.x;
        let mut right = left + (extrema.implied - left) / 2.0;
        if right - left <= self.config.min_band_width {
            right = extrema.implied;
        }
        Band::new(left, right)
    }

    /// Band between the implied probability and the curve maximum.
    pub fn beyond_implied_band(&self, extrema: &Extrema) -> Result<Band, DomainError> {
        let implied = extrema.implied;
        let x_max = extrema.max.x;
        let mut left = implied + (x_max - implied) / 2.0;
        let mut right = (x_max + (1.0 - x_max) / 2.0).min(self.config.band_ceiling);
        if right <= left {
            left = implied;
        }
        if left < self.config.low_left_floor {
            (left, right) = self.config.low_confidence_band;
        }
        Band::new(left, right)
    }

    /// Draw a probability for one outcome's odds, falling back to the fixed
    /// band on any failure.
    pub fn generate_probability(&self, odds: f64, side: BandSide) -> ProbabilityDraw {
        let drawn = self
            .generate_band(odds, side)
            .and_then(|band| self.draw(band).map(|p| (band, p)));

        match drawn {
            Ok((band, probability)) => ProbabilityDraw::Sampled { probability, band },
            Err(reason) => {
                warn!(odds, %side, error = %reason, "band: generation failed, using fallback band");
                self.fallback(reason)
            }
        }
    }

    /// Draw from the configured fallback band.
    pub fn fallback(&self, reason: DomainError) -> ProbabilityDraw {
        let (left, right) = self.config.fallback_band;
        let band = Band { left, right };
        let probability = self.draw(band).unwrap_or(left);
        ProbabilityDraw::Fallback {
            probability,
            band,
            reason,
        }
    }

    /// Uniform draw from the band's grid.
    pub fn draw(&self, band: Band) -> Result<f64, DomainError> {
        let (lo, hi) = band.grid(self.config.resolution)?;
        let step = self.rng.lock().gen_range(lo..=hi);
        Ok(f64::from(step) / f64::from(self.config.resolution))
    }
}

impl<R> fmt::Debug for BandGenerator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BandGenerator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
