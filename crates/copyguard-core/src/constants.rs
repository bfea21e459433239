//! Default tuning constants. Every value here can be overridden through
//! [`DetectionConfig`](crate::config::DetectionConfig) or
//! [`BandConfig`](crate::config::BandConfig).

// ---------------------------------------------------------------------------
// Copycat detection
// ---------------------------------------------------------------------------

/// Exact-match entries a pair may share before both participants are
/// penalized, regardless of adjacency.
pub const EXACT_MATCH_PREDICTIONS_THRESHOLD: u32 = 10;

/// Length of an unbroken run of exact matches (in chronological match order)
/// that marks a pair for penalty.
pub const SUSPICIOUS_CONSECUTIVE_MATCHES_THRESHOLD: u32 = 5;

/// Absolute probability difference below which two predictions are "exact".
///
/// Submitted probabilities carry four decimals, so two distinct submissions
/// always differ by at least `1e-4`.
pub const EXACT_MATCH_EPSILON: f64 = 1e-5;

/// Chance that a qualifying penalized relationship is written to the audit log.
pub const AUDIT_SAMPLE_RATE: f64 = 0.005;

/// Maximum history or streak entries shown per audit record.
pub const AUDIT_EXCERPT_LEN: usize = 3;

// ---------------------------------------------------------------------------
// Scoring curve shape
// ---------------------------------------------------------------------------

/// Plateau boundary height. More negative lowers the plateau half-width.
pub const CURVE_A: f64 = -2.0;

/// Rate at which the plateau half-width changes with odds.
pub const CURVE_B: f64 = 0.3;

/// Asymptotic plateau half-width.
pub const CURVE_C: f64 = 3.0;

/// Gaussian spread outside the plateau (`sigma^2 = t * odds`).
pub const CURVE_T: f64 = 1.0;

// ---------------------------------------------------------------------------
// Band generation
// ---------------------------------------------------------------------------

/// Hard ceiling on the right edge of a beyond-implied band.
pub const BAND_CEILING: f64 = 0.89;

/// Near-implied bands at or below this width are widened to the implied
/// probability.
pub const MIN_BAND_WIDTH: f64 = 0.03;

/// Beyond-implied bands whose left edge falls below this are replaced by
/// [`LOW_CONFIDENCE_BAND`].
pub const LOW_LEFT_FLOOR: f64 = 0.33;

/// Replacement band for beyond-implied bands starting below [`LOW_LEFT_FLOOR`].
pub const LOW_CONFIDENCE_BAND: (f64, f64) = (0.35, 0.89);

/// Band used whenever the generation pipeline fails.
pub const FALLBACK_BAND: (f64, f64) = (0.55, 0.75);

/// Grid resolution for drawn probabilities (four decimals).
pub const PROBABILITY_RESOLUTION: u32 = 10_000;

/// Absolute x-tolerance of the bounded minimizer.
pub const SOLVER_TOLERANCE: f64 = 1e-5;

/// Objective evaluations allowed before the minimizer reports non-convergence.
pub const SOLVER_MAX_EVALUATIONS: usize = 500;
