//! Core data model: leagues, matches, predictions.
//!
//! Matches and predictions are owned by the external persistence layer; the
//! core only ever reads them. String-typed fields arriving from outside are
//! converted into the closed enums here and rejected with
//! [`DomainError`] when unknown.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Participant identifier (network uid).
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(transparent)]
pub struct MinerId(pub u32);

impl fmt::Display for MinerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for MinerId {
    fn from(uid: u32) -> Self {
        Self(uid)
    }
}

/// Match identifier as issued by the schedule provider.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct MatchId(pub String);

impl MatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MatchId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Sport played in a league. Decides whether a draw is a valid pick.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Soccer,
    Baseball,
    Basketball,
    AmericanFootball,
}

impl Sport {
    /// Whether matches in this sport can end level.
    pub fn allows_draw(&self) -> bool {
        matches!(self, Self::Soccer)
    }
}

/// Competition a match belongs to.
///
/// # Examples
///
/// ```
/// use copyguard_core::types::{League, Sport};
///
/// let league: League = "English Premier League".parse().unwrap();
/// assert_eq!(league, League::Epl);
/// assert_eq!(league.sport(), Sport::Soccer);
/// assert_eq!("nba".parse::<League>().unwrap(), League::Nba);
/// ```
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum League {
    #[serde(rename = "EPL")]
    Epl,
    #[serde(rename = "MLS")]
    Mls,
    #[serde(rename = "MLB")]
    Mlb,
    #[serde(rename = "NBA")]
    Nba,
    #[serde(rename = "NFL")]
    Nfl,
}

impl League {
    pub const ALL: [League; 5] = [Self::Epl, Self::Mls, Self::Mlb, Self::Nba, Self::Nfl];

    /// Short code used on the wire and in snapshots.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Epl => "EPL",
            Self::Mls => "MLS",
            Self::Mlb => "MLB",
            Self::Nba => "NBA",
            Self::Nfl => "NFL",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Epl => "English Premier League",
            Self::Mls => "American Major League Soccer",
            Self::Mlb => "MLB",
            Self::Nba => "NBA",
            Self::Nfl => "NFL",
        }
    }

    pub fn sport(&self) -> Sport {
        match self {
            Self::Epl | Self::Mls => Sport::Soccer,
            Self::Mlb => Sport::Baseball,
            Self::Nba => Sport::Basketball,
            Self::Nfl => Sport::AmericanFootball,
        }
    }
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for League {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|l| {
                l.code().eq_ignore_ascii_case(needle)
                    || l.display_name().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| DomainError::UnknownLeague(s.to_string()))
    }
}

/// Outcome a participant attaches its probability to.
///
/// # Examples
///
/// ```
/// use copyguard_core::types::ProbabilityChoice;
///
/// assert_eq!("HomeTeam".parse::<ProbabilityChoice>().unwrap(), ProbabilityChoice::HomeTeam);
/// assert_eq!("draw".parse::<ProbabilityChoice>().unwrap(), ProbabilityChoice::Draw);
/// assert!("Overtime".parse::<ProbabilityChoice>().is_err());
/// ```
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProbabilityChoice {
    HomeTeam,
    AwayTeam,
    Draw,
}

impl ProbabilityChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HomeTeam => "HomeTeam",
            Self::AwayTeam => "AwayTeam",
            Self::Draw => "Draw",
        }
    }
}

impl fmt::Display for ProbabilityChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProbabilityChoice {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hometeam" | "home" => Ok(Self::HomeTeam),
            "awayteam" | "away" => Ok(Self::AwayTeam),
            "draw" => Ok(Self::Draw),
            _ => Err(DomainError::UnknownOutcome(s.to_string())),
        }
    }
}

/// Which half of the scoring curve a generated band is centred on.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BandSide {
    /// Lower-odds outcome. Band sits beyond the implied probability.
    Favored,
    /// Higher-odds outcome. Band sits between the curve minimum and the
    /// implied probability.
    Underdog,
}

impl fmt::Display for BandSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Favored => f.write_str("favored"),
            Self::Underdog => f.write_str("underdog"),
        }
    }
}

impl FromStr for BandSide {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "favored" | "favoured" | "favorite" => Ok(Self::Favored),
            "underdog" => Ok(Self::Underdog),
            _ => Err(DomainError::UnknownSide(s.to_string())),
        }
    }
}

/// Scheduled or completed match.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Match {
    pub id: MatchId,
    pub league: League,
    pub match_date: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub is_complete: bool,
}

impl Match {
    /// Identity and date, the only parts the detection engine reads.
    pub fn scheduled(&self) -> ScheduledMatch {
        ScheduledMatch {
            match_id: self.id.clone(),
            match_date: self.match_date,
        }
    }
}

/// Match identity with its date, used to order relationship histories.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScheduledMatch {
    pub match_id: MatchId,
    pub match_date: DateTime<Utc>,
}

impl ScheduledMatch {
    pub fn new(match_id: impl Into<String>, match_date: DateTime<Utc>) -> Self {
        Self {
            match_id: MatchId(match_id.into()),
            match_date,
        }
    }
}

/// A single participant's prediction for one match.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Prediction {
    pub miner: MinerId,
    pub match_id: MatchId,
    pub league: League,
    pub choice: ProbabilityChoice,
    /// Probability attached to `choice`, strictly inside `(0, 1)`.
    pub probability: f64,
    /// Submission time. Orders multiple predictions by the same participant
    /// for the same match.
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Prediction {
    /// Check that the probability is finite and strictly inside `(0, 1)`.
    pub fn validate(&self) -> Result<(), DomainError> {
        check_probability(self.probability)
    }
}

/// Prediction joined with its match date.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PredictionWithMatchData {
    pub prediction: Prediction,
    pub match_date: DateTime<Utc>,
}

/// Reject probabilities that are non-finite or outside the open unit interval.
pub fn check_probability(p: f64) -> Result<(), DomainError> {
    if p.is_finite() && p > 0.0 && p < 1.0 {
        Ok(())
    } else {
        Err(DomainError::Probability(p))
    }
}

/// Reject decimal odds that are non-finite or not strictly above 1.
pub fn check_odds(odds: f64) -> Result<(), DomainError> {
    if odds.is_finite() && odds > 1.0 {
        Ok(())
    } else {
        Err(DomainError::Odds(odds))
    }
}
