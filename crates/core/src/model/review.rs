use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors that can occur while interpreting an answer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("invalid difficulty value: {0}")]
    InvalidDifficulty(u8),

    #[error("unknown difficulty: {0:?}")]
    UnknownDifficulty(String),
}

//
// ─── DIFFICULTY ───────────────────────────────────────────────────────────────
//

/// Four-level self-assessment given after revealing the answer.
///
/// Only `Good` and `Easy` count as a correct answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Did not recall. Shown again within a minute.
    Again,
    /// Recalled with trouble. Shown again within minutes.
    Hard,
    /// Recalled correctly.
    Good,
    /// Recalled instantly.
    Easy,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Again,
        Difficulty::Hard,
        Difficulty::Good,
        Difficulty::Easy,
    ];

    /// Converts a numeric difficulty (0-3) to a `Difficulty`.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::InvalidDifficulty` if the value is not in the range 0-3.
    pub fn from_u8(value: u8) -> Result<Self, ReviewError> {
        match value {
            0 => Ok(Self::Again),
            1 => Ok(Self::Hard),
            2 => Ok(Self::Good),
            3 => Ok(Self::Easy),
            _ => Err(ReviewError::InvalidDifficulty(value)),
        }
    }

    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, Difficulty::Good | Difficulty::Easy)
    }

    /// Minimum delay before the card is due again, in minutes.
    #[must_use]
    pub fn floor_minutes(self) -> i64 {
        match self {
            Difficulty::Again => 1,
            Difficulty::Hard => 6,
            Difficulty::Good => 1_440,
            Difficulty::Easy => 5_760,
        }
    }

    /// Experience awarded for answering with this difficulty.
    #[must_use]
    pub fn xp(self) -> u32 {
        match self {
            Difficulty::Again => 2,
            Difficulty::Hard => 5,
            Difficulty::Good => 10,
            Difficulty::Easy => 15,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Again => "again",
            Difficulty::Hard => "hard",
            Difficulty::Good => "good",
            Difficulty::Easy => "easy",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "again" => Ok(Difficulty::Again),
            "hard" => Ok(Difficulty::Hard),
            "good" => Ok(Difficulty::Good),
            "easy" => Ok(Difficulty::Easy),
            _ => Err(ReviewError::UnknownDifficulty(s.to_owned())),
        }
    }
}

//
// ─── ANSWER LOG ───────────────────────────────────────────────────────────────
//

/// Record of a single answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerLog {
    pub card_name: String,
    pub difficulty: Difficulty,
    pub answered_at: DateTime<Utc>,
}

impl AnswerLog {
    #[must_use]
    pub fn new(card_name: impl Into<String>, difficulty: Difficulty, answered_at: DateTime<Utc>) -> Self {
        Self {
            card_name: card_name.into(),
            difficulty,
            answered_at,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
