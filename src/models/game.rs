use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Outcome of a single match. `Pending` until the admin uploads a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MatchStatus {
    #[default]
    Pending,
    Won,
    Lost,
}

impl MatchStatus {
    /// Tolerant parse for data coming off the wire. The backend has stored
    /// statuses with inconsistent casing; anything unrecognized (including
    /// an empty string) normalizes to `Pending` rather than failing.
    pub fn normalize(raw: &str) -> MatchStatus {
        match raw.trim().to_ascii_lowercase().as_str() {
            "won" | "win" => MatchStatus::Won,
            "lost" | "loss" => MatchStatus::Lost,
            _ => MatchStatus::Pending,
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, MatchStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Won => "won",
            MatchStatus::Lost => "lost",
        }
    }
}

impl From<String> for MatchStatus {
    fn from(raw: String) -> Self {
        MatchStatus::normalize(&raw)
    }
}

impl From<MatchStatus> for String {
    fn from(status: MatchStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Strict parse for admin input, where a typo must not silently become
/// `Pending`.
impl FromStr for MatchStatus {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(MatchStatus::Pending),
            "won" | "win" => Ok(MatchStatus::Won),
            "lost" | "loss" => Ok(MatchStatus::Lost),
            other => Err(Error::validation(format!(
                "unknown match result '{}': expected pending, won or lost",
                other
            ))),
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scheduled match with its prediction and odds.
///
/// The `id` is synthetic (`{category}-{millis}-{index}`, assigned when a
/// booking is loaded) and is not stable across process restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: String,
    pub category: super::bundle::Category,
    pub home_team: String,
    pub away_team: String,
    pub prediction: String,
    pub odds: f64,
    pub status: MatchStatus,
    /// External booking code this game was loaded from.
    pub booking_code: String,
    pub share_code: Option<String>,
    pub alt_code: Option<String>,
    /// Set when the game is uploaded; slips group on this timestamp.
    pub deadline: Option<DateTime<Utc>>,
}

impl GameRecord {
    pub fn fixture(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }

    /// Apply a result. Transitions only `Pending -> {Won, Lost}`; a settled
    /// game never changes again (re-applying the same result is a no-op).
    pub fn settle(&mut self, result: MatchStatus) -> Result<()> {
        if self.status == result {
            return Ok(());
        }
        if self.status.is_settled() {
            return Err(Error::validation(format!(
                "{} is already settled as {}",
                self.fixture(),
                self.status
            )));
        }
        self.status = result;
        Ok(())
    }

    pub fn format(&self) -> String {
        format!(
            "{} | {} @ {:.2} [{}]",
            self.fixture(),
            self.prediction,
            self.odds,
            self.status
        )
    }
}
