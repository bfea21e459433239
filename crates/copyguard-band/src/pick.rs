//! Choosing which outcome of a full odds line to predict.

use copyguard_core::error::DomainError;
use copyguard_core::types::{BandSide, ProbabilityChoice, Sport};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::band::{BandGenerator, ProbabilityDraw};

/// Decimal odds for every outcome of one match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchOdds {
    pub home: f64,
    pub away: f64,
    #[serde(default)]
    pub draw: Option<f64>,
}

impl MatchOdds {
    pub fn new(home: f64, away: f64) -> Self {
        Self {
            home,
            away,
            draw: None,
        }
    }

    pub fn with_draw(mut self, draw: f64) -> Self {
        self.draw = Some(draw);
        self
    }
}

/// The outcome selected from an odds line and the odds it is priced at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OddsPick {
    pub choice: ProbabilityChoice,
    pub odds: f64,
    pub side: BandSide,
}

/// A full prediction: the chosen outcome and the probability drawn for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionDraw {
    pub choice: ProbabilityChoice,
    pub draw: ProbabilityDraw,
}

impl PredictionDraw {
    pub fn probability(&self) -> f64 {
        self.draw.probability()
    }
}

/// Pick the outcome to predict.
///
/// `Favored` takes the team with the lower odds, `Underdog` the one with the
/// higher odds. Level odds pick the draw in sports that allow one (priced at
/// the draw odds when quoted, otherwise the home odds) and the home team
/// everywhere else.
///
/// # Examples
///
/// ```
/// use copyguard_band::{pick::pick_outcome, MatchOdds};
/// use copyguard_core::{BandSide, ProbabilityChoice, Sport};
///
/// let odds = MatchOdds::new(1.8, 4.2);
/// let pick = pick_outcome(&odds, Sport::Soccer, BandSide::Favored).unwrap();
/// assert_eq!(pick.choice, ProbabilityChoice::HomeTeam);
/// assert_eq!(pick.odds, 1.8);
/// ```
pub fn pick_outcome(odds: &MatchOdds, sport: Sport, side: BandSide) -> Result<OddsPick, DomainError> {
    if !odds.home.is_finite() {
        return Err(DomainError::MissingOdds("home"));
    }
    if !odds.away.is_finite() {
        return Err(DomainError::MissingOdds("away"));
    }

    let (choice, price) = if odds.home == odds.away {
        if sport.allows_draw() {
            (ProbabilityChoice::Draw, odds.draw.unwrap_or(odds.home))
        } else {
            (ProbabilityChoice::HomeTeam, odds.home)
        }
    } else {
        let home_lower = odds.home < odds.away;
        match (side, home_lower) {
            (BandSide::Favored, true) | (BandSide::Underdog, false) => {
                (ProbabilityChoice::HomeTeam, odds.home)
            }
            (BandSide::Favored, false) | (BandSide::Underdog, true) => {
                (ProbabilityChoice::AwayTeam, odds.away)
            }
        }
    };

    Ok(OddsPick {
        choice,
        odds: price,
        side,
    })
}

impl<R: RngCore> BandGenerator<R> {
    /// Pick an outcome and draw its probability.
    ///
    /// Never fails: when the odds line is unusable, or no band can be built
    /// for the picked outcome, the home team is predicted with a draw from
    /// the fallback band.
    pub fn predict(&self, odds: &MatchOdds, sport: Sport, side: BandSide) -> PredictionDraw {
        match pick_outcome(odds, sport, side) {
            Ok(pick) => {
                let draw = self.generate_probability(pick.odds, pick.side);
                debug!(
                    choice = %pick.choice,
                    odds = pick.odds,
                    probability = draw.probability(),
                    fallback = draw.is_fallback(),
                    "predict: drawn"
                );
                let choice = if draw.is_fallback() {
                    ProbabilityChoice::HomeTeam
                } else {
                    pick.choice
                };
                PredictionDraw { choice, draw }
            }
            Err(reason) => {
                warn!(error = %reason, "predict: unusable odds line, predicting home team");
                PredictionDraw {
                    choice: ProbabilityChoice::HomeTeam,
                    draw: self.fallback(reason),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copyguard_core::config::BandConfig;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn generator() -> BandGenerator<StdRng> {
        BandGenerator::with_rng(BandConfig::default(), StdRng::seed_from_u64(11)).unwrap()
    }

    // --- pick_outcome ---

    #[test]
    fn favored_takes_lower_odds() {
        let odds = MatchOdds::new(3.1, 1.6);
        let pick = pick_outcome(&odds, Sport::Basketball, BandSide::Favored).unwrap();
        assert_eq!(pick.choice, ProbabilityChoice::AwayTeam);
        assert_eq!(pick.odds, 1.6);
        assert_eq!(pick.side, BandSide::Favored);
    }

    #[test]
    fn underdog_takes_higher_odds() {
        let odds = MatchOdds::new(3.1, 1.6);
        let pick = pick_outcome(&odds, Sport::Basketball, BandSide::Underdog).unwrap();
        assert_eq!(pick.choice, ProbabilityChoice::HomeTeam);
        assert_eq!(pick.odds, 3.1);
    }

    #[test]
    fn level_soccer_odds_pick_draw() {
        let odds = MatchOdds::new(2.6, 2.6).with_draw(3.2);
        let pick = pick_outcome(&odds, Sport::Soccer, BandSide::Favored).unwrap();
        assert_eq!(pick.choice, ProbabilityChoice::Draw);
        assert_eq!(pick.odds, 3.2);
    }

    #[test]
    fn level_soccer_odds_without_draw_price_use_home() {
        let odds = MatchOdds::new(2.6, 2.6);
        let pick = pick_outcome(&odds, Sport::Soccer, BandSide::Underdog).unwrap();
        assert_eq!(pick.choice, ProbabilityChoice::Draw);
        assert_eq!(pick.odds, 2.6);
    }

    #[test]
    fn level_odds_without_draws_pick_home() {
        let odds = MatchOdds::new(1.91, 1.91);
        for sport in [Sport::Baseball, Sport::Basketball, Sport::AmericanFootball] {
            let pick = pick_outcome(&odds, sport, BandSide::Favored).unwrap();
            assert_eq!(pick.choice, ProbabilityChoice::HomeTeam);
        }
    }

    #[test]
    fn missing_odds_rejected() {
        let odds = MatchOdds::new(f64::NAN, 2.0);
        assert_eq!(
            pick_outcome(&odds, Sport::Soccer, BandSide::Favored),
            Err(DomainError::MissingOdds("home"))
        );
        let odds = MatchOdds::new(2.0, f64::INFINITY);
        assert_eq!(
            pick_outcome(&odds, Sport::Soccer, BandSide::Favored),
            Err(DomainError::MissingOdds("away"))
        );
    }

    // --- predict ---

    #[test]
    fn predict_draws_for_picked_outcome() {
        let g = generator();
        let prediction = g.predict(&MatchOdds::new(1.7, 2.4), Sport::Baseball, BandSide::Favored);
        assert_eq!(prediction.choice, ProbabilityChoice::HomeTeam);
        assert!(!prediction.draw.is_fallback());
        assert!(prediction.probability() > 1.0 / 1.7);
    }

    #[test]
    fn predict_underdog_stays_below_implied() {
        let g = generator();
        for _ in 0..200 {
            let prediction = g.predict(&MatchOdds::new(1.5, 4.0), Sport::AmericanFootball, BandSide::Underdog);
            assert_eq!(prediction.choice, ProbabilityChoice::AwayTeam);
            assert!(prediction.probability() <= 0.25);
        }
    }

    #[test]
    fn unusable_odds_line_predicts_home_with_fallback() {
        let g = generator();
        let prediction = g.predict(&MatchOdds::new(f64::NAN, 2.0), Sport::Soccer, BandSide::Favored);
        assert_eq!(prediction.choice, ProbabilityChoice::HomeTeam);
        assert!(prediction.draw.is_fallback());
        assert!((0.55..=0.75).contains(&prediction.probability()));
    }

    #[test]
    fn invalid_picked_odds_fall_back_to_home() {
        let g = generator();
        let prediction = g.predict(&MatchOdds::new(0.9, 3.0), Sport::Basketball, BandSide::Favored);
        assert_eq!(prediction.choice, ProbabilityChoice::HomeTeam);
        assert!(prediction.draw.is_fallback());
    }

    #[test]
    fn heavy_away_favorite_without_band_switches_to_home() {
        let g = generator();
        // 1/1.08 is above the band ceiling, so no band exists for the away side.
        let odds = MatchOdds::new(9.0, 1.08);
        assert_eq!(
            pick_outcome(&odds, Sport::Basketball, BandSide::Favored).unwrap().choice,
            ProbabilityChoice::AwayTeam
        );
        let prediction = g.predict(&odds, Sport::Basketball, BandSide::Favored);
        assert_eq!(prediction.choice, ProbabilityChoice::HomeTeam);
        assert!(matches!(prediction.draw.fallback_reason(), Some(DomainError::EmptyBand { .. })));
        assert!((0.55..=0.75).contains(&prediction.probability()));
    }
}
