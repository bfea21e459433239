//! Bounded extrema of the scoring curve.
//!
//! The minimum of `y` is searched on `(0, 1/odds)` and the maximum on
//! `(1/odds, 1)`, each with a bounded Brent minimizer (golden-section steps
//! with parabolic interpolation). The minimizer only ever evaluates strictly
//! interior points, so the open ends of the probability domain are never
//! touched.

use copyguard_core::config::BandConfig;
use copyguard_core::error::DomainError;
use copyguard_core::types::check_odds;
use tracing::debug;

use crate::curve::ScoringCurve;

/// `(3 - sqrt(5)) / 2`, the golden-section step fraction.
const GOLDEN_MEAN: f64 = 0.381_966_011_250_105_1;

/// Result of a bounded one-dimensional minimization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimum {
    pub x: f64,
    pub fx: f64,
    pub evaluations: usize,
}

/// Minimize `f` over the open interval `(lower, upper)`.
///
/// Terminates once the bracket around the best point is narrower than
/// roughly `xatol`. Exceeding `max_evaluations` objective evaluations first
/// is reported as [`DomainError::NoConvergence`]; a non-finite objective
/// value aborts with [`DomainError::NonFinite`]. Errors returned by `f`
/// propagate unchanged.
///
/// # Examples
///
/// ```
/// use copyguard_band::extrema::bounded_minimize;
///
/// let m = bounded_minimize(|x| Ok((x - 0.3) * (x - 0.3)), 0.0, 1.0, 1e-6, 500).unwrap();
/// assert!((m.x - 0.3).abs() < 1e-4);
/// ```
pub fn bounded_minimize<F>(
    mut f: F,
    lower: f64,
    upper: f64,
    xatol: f64,
    max_evaluations: usize,
) -> Result<Minimum, DomainError>
where
    F: FnMut(f64) -> Result<f64, DomainError>,
{
    if !(lower.is_finite() && upper.is_finite() && lower < upper) {
        return Err(DomainError::Interval { lower, upper });
    }
    let sqrt_eps = f64::EPSILON.sqrt();

    let mut eval = |x: f64| -> Result<f64, DomainError> {
        let fx = f(x)?;
        if fx.is_finite() {
            Ok(fx)
        } else {
            Err(DomainError::NonFinite { x })
        }
    };

    let (mut a, mut b) = (lower, upper);
    // xf: best point so far; nfc: second best; fulc: previous second best.
    let mut xf = a + GOLDEN_MEAN * (b - a);
    let mut nfc = xf;
    let mut fulc = xf;
    let mut fx = eval(xf)?;
    let mut fnfc = fx;
    let mut ffulc = fx;
    let mut evaluations = 1usize;

    let mut rat = 0.0f64;
    let mut e = 0.0f64;
    let mut xm = 0.5 * (a + b);
    let mut tol1 = sqrt_eps * xf.abs() + xatol / 3.0;
    let mut tol2 = 2.0 * tol1;

    while (xf - xm).abs() > tol2 - 0.5 * (b - a) {
        if evaluations >= max_evaluations {
            return Err(DomainError::NoConvergence { evaluations });
        }

        let mut golden = true;
        if e.abs() > tol1 {
            // Try a parabolic fit through the three best points.
            let mut r = (xf - nfc) * (fx - ffulc);
            let mut q = (xf - fulc) * (fx - fnfc);
            let mut p = (xf - fulc) * q - (xf - nfc) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            }
            q = q.abs();
            r = e;
            e = rat;

            if p.abs() < (0.5 * q * r).abs() && p > q * (a - xf) && p < q * (b - xf) {
                golden = false;
                rat = p / q;
                let x = xf + rat;
                if (x - a) < tol2 || (b - x) < tol2 {
                    rat = tol1 * unit_sign(xm - xf);
                }
            }
        }

        if golden {
            e = if xf >= xm { a - xf } else { b - xf };
            rat = GOLDEN_MEAN * e;
        }

        let x = xf + unit_sign(rat) * rat.abs().max(tol1);
        let fu = eval(x)?;
        evaluations += 1;

        if fu <= fx {
            if x >= xf {
                a = xf;
            } else {
                b = xf;
            }
            fulc = nfc;
            ffulc = fnfc;
            nfc = xf;
            fnfc = fx;
            xf = x;
            fx = fu;
        } else {
            if x < xf {
                a = x;
            } else {
                b = x;
            }
            if fu <= fnfc || nfc == xf {
                fulc = nfc;
                ffulc = fnfc;
                nfc = x;
                fnfc = fu;
            } else if fu <= ffulc || fulc == xf || fulc == nfc {
                fulc = x;
                ffulc = fu;
            }
        }

        xm = 0.5 * (a + b);
        tol1 = sqrt_eps * xf.abs() + xatol / 3.0;
        tol2 = 2.0 * tol1;
    }

    Ok(Minimum {
        x: xf,
        fx,
        evaluations,
    })
}

/// Sign of `v`, with zero mapped to `+1`.
fn unit_sign(v: f64) -> f64 {
    if v < 0.0 { -1.0 } else { 1.0 }
}

/// A located extremum of the scoring curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremum {
    /// Probability at which the extremum is attained.
    pub x: f64,
    /// Curve value there.
    pub y: f64,
}

/// Minimum below and maximum above the implied probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extrema {
    pub implied: f64,
    pub min: Extremum,
    pub max: Extremum,
}

/// Finds the extrema of a [`ScoringCurve`] for given odds.
#[derive(Debug, Clone)]
pub struct ExtremaSolver {
    curve: ScoringCurve,
    tolerance: f64,
    max_evaluations: usize,
}

impl ExtremaSolver {
    pub fn new(curve: ScoringCurve, tolerance: f64, max_evaluations: usize) -> Self {
        Self {
            curve,
            tolerance,
            max_evaluations,
        }
    }

    pub fn from_config(config: &BandConfig) -> Self {
        Self::new(
            ScoringCurve::new(config.curve),
            config.solver_tolerance,
            config.solver_max_evaluations,
        )
    }

    pub fn curve(&self) -> &ScoringCurve {
        &self.curve
    }

    /// Locate `argmin y` on `(0, 1/odds)` and `argmax y` on `(1/odds, 1)`.
    ///
    /// Any domain violation or non-convergence is returned as-is; falling
    /// back is the caller's job.
    pub fn find_extrema(&self, odds: f64) -> Result<Extrema, DomainError> {
        check_odds(odds)?;
        let implied = 1.0 / odds;

        let lo = bounded_minimize(
            |x| self.curve.y(odds, x),
            0.0,
            implied,
            self.tolerance,
            self.max_evaluations,
        )?;
        let hi = bounded_minimize(
            |x| self.curve.y(odds, x).map(|v| -v),
            implied,
            1.0,
            self.tolerance,
            self.max_evaluations,
        )?;

        debug!(
            odds,
            x_min = lo.x,
            min_y = lo.fx,
            x_max = hi.x,
            max_y = -hi.fx,
            evaluations = lo.evaluations + hi.evaluations,
            "extrema: solved"
        );

        Ok(Extrema {
            implied,
            min: Extremum { x: lo.x, y: lo.fx },
            max: Extremum { x: hi.x, y: -hi.fx },
        })
    }
}

impl Default for ExtremaSolver {
    fn default() -> Self {
        Self::from_config(&BandConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn solver() -> ExtremaSolver {
        ExtremaSolver::default()
    }

    // --- bounded_minimize ---

    #[test]
    fn minimizes_parabola() {
        let m = bounded_minimize(|x| Ok((x - 2.0).powi(2) + 1.0), -5.0, 5.0, 1e-8, 500).unwrap();
        assert!((m.x - 2.0).abs() < 1e-6, "x = {}", m.x);
        assert!((m.fx - 1.0).abs() < 1e-10);
    }

    #[test]
    fn monotone_function_converges_to_edge() {
        let m = bounded_minimize(|x| Ok(x), 0.0, 1.0, 1e-5, 500).unwrap();
        assert!(m.x > 0.0 && m.x < 1e-4, "x = {}", m.x);
    }

    #[test]
    fn minimum_stays_inside_interval() {
        let m = bounded_minimize(|x| Ok(-x), 0.25, 0.5, 1e-5, 500).unwrap();
        assert!(m.x > 0.25 && m.x < 0.5);
        assert!(0.5 - m.x < 1e-4);
    }

    #[test]
    fn evaluation_budget_exhaustion_is_an_error() {
        let err = bounded_minimize(|x| Ok((x - 0.3).powi(2)), 0.0, 1.0, 1e-12, 3).unwrap_err();
        assert_eq!(err, DomainError::NoConvergence { evaluations: 3 });
    }

    #[test]
    fn non_finite_objective_is_an_error() {
        let err = bounded_minimize(|_| Ok(f64::NAN), 0.0, 1.0, 1e-5, 500).unwrap_err();
        assert!(matches!(err, DomainError::NonFinite { .. }));
    }

    #[test]
    fn objective_errors_propagate() {
        let err = bounded_minimize(|x| Err(DomainError::Probability(x)), 0.0, 1.0, 1e-5, 500)
            .unwrap_err();
        assert!(matches!(err, DomainError::Probability(_)));
    }

    #[test]
    fn inverted_interval_rejected() {
        let err = bounded_minimize(|x| Ok(x), 1.0, 0.0, 1e-5, 500).unwrap_err();
        assert_eq!(err, DomainError::Interval { lower: 1.0, upper: 0.0 });
    }

    // --- ExtremaSolver ---

    #[test]
    fn extrema_bracket_implied_probability() {
        let s = solver();
        for odds in [1.1, 1.5, 2.0, 3.0, 4.0, 10.0, 25.0] {
            let ex = s.find_extrema(odds).unwrap();
            assert!(ex.min.x <= ex.implied, "odds {odds}: x_min {} > implied", ex.min.x);
            assert!(ex.max.x >= ex.implied, "odds {odds}: x_max {} < implied", ex.max.x);
            assert!(ex.min.y <= 0.0);
            assert!(ex.max.y >= 0.0);
        }
    }

    #[test]
    fn even_money_favourite_maximum_near_certainty() {
        // odds 2: every prob above 0.5 sits on the plateau, so y rises to the edge.
        let ex = solver().find_extrema(2.0).unwrap();
        assert!(ex.max.x > 0.99, "x_max = {}", ex.max.x);
    }

    #[test]
    fn long_odds_minimum_at_plateau_edge() {
        // odds 4: plateau half-width w ≈ 2.187, so the minimum sits near
        // 1 / (4 + w) ≈ 0.1616 where the plateau ends.
        let ex = solver().find_extrema(4.0).unwrap();
        assert!((ex.min.x - 0.1616).abs() < 0.002, "x_min = {}", ex.min.x);
        assert!((ex.min.y + 2.187).abs() < 0.01, "min_y = {}", ex.min.y);
    }

    #[test]
    fn invalid_odds_rejected() {
        assert_eq!(solver().find_extrema(1.0), Err(DomainError::Odds(1.0)));
        assert!(solver().find_extrema(f64::NAN).is_err());
    }

    #[test]
    fn tiny_budget_fails_loudly() {
        let s = ExtremaSolver::new(ScoringCurve::default(), 1e-5, 2);
        assert!(matches!(
            s.find_extrema(3.0),
            Err(DomainError::NoConvergence { .. })
        ));
    }

    proptest! {
        #[test]
        fn extrema_always_bracket_implied(odds in 1.001f64..200.0) {
            let ex = solver().find_extrema(odds).unwrap();
            prop_assert!(ex.min.x > 0.0);
            prop_assert!(ex.min.x <= ex.implied);
            prop_assert!(ex.implied <= ex.max.x);
            prop_assert!(ex.max.x < 1.0);
        }
    }
}
