use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CardStatsError {
    #[error("correct answers ({correct}) exceed attempts ({attempts})")]
    CorrectExceedsAttempts { correct: u32, attempts: u32 },
}

/// Lifecycle of a card in the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    /// Never answered.
    #[default]
    New,
    /// Answered at least once and scheduled on the interval ladder.
    Learning,
    /// Manually flagged as weak; unscheduled until answered again.
    Review,
}

/// Rounded percentage of correct answers; `0` when nothing was attempted.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn accuracy_percent(correct: u32, attempts: u32) -> u8 {
    if attempts == 0 {
        return 0;
    }
    let ratio = f64::from(correct.min(attempts)) / f64::from(attempts);
    (ratio * 100.0).round() as u8
}

/// Study history of one card, keyed externally by card name.
///
/// Fields are only changed through the scheduler; everything else reads them
/// or replaces the whole value (undo, storage).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "PersistedCardStats")]
pub struct CardStats {
    attempts: u32,
    correct: u32,
    accuracy: u8,
    last_studied: Option<DateTime<Utc>>,
    consecutive_correct: u32,
    next_review: Option<DateTime<Utc>>,
    srs_level: u32,
    status: CardStatus,
}

/// Lenient on-disk shape; validated into `CardStats`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PersistedCardStats {
    attempts: u32,
    correct: u32,
    last_studied: Option<DateTime<Utc>>,
    consecutive_correct: u32,
    next_review: Option<DateTime<Utc>>,
    srs_level: u32,
    status: CardStatus,
}

impl TryFrom<PersistedCardStats> for CardStats {
    type Error = CardStatsError;

    fn try_from(raw: PersistedCardStats) -> Result<Self, Self::Error> {
        if raw.correct > raw.attempts {
            return Err(CardStatsError::CorrectExceedsAttempts {
                correct: raw.correct,
                attempts: raw.attempts,
            });
        }
        Ok(Self {
            attempts: raw.attempts,
            correct: raw.correct,
            accuracy: accuracy_percent(raw.correct, raw.attempts),
            last_studied: raw.last_studied,
            consecutive_correct: raw.consecutive_correct,
            next_review: raw.next_review,
            srs_level: raw.srs_level,
            status: raw.status,
        })
    }
}

impl CardStats {
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn accuracy(&self) -> u8 {
        self.accuracy
    }

    #[must_use]
    pub fn last_studied(&self) -> Option<DateTime<Utc>> {
        self.last_studied
    }

    #[must_use]
    pub fn consecutive_correct(&self) -> u32 {
        self.consecutive_correct
    }

    #[must_use]
    pub fn next_review(&self) -> Option<DateTime<Utc>> {
        self.next_review
    }

    #[must_use]
    pub fn srs_level(&self) -> u32 {
        self.srs_level
    }

    #[must_use]
    pub fn status(&self) -> CardStatus {
        self.status
    }

    /// A learning card whose scheduled time has passed.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == CardStatus::Learning && self.next_review.is_some_and(|at| at <= now)
    }

    pub(crate) fn record_attempt(&mut self, correct: bool, at: DateTime<Utc>) {
        self.attempts = self.attempts.saturating_add(1);
        if correct {
            self.correct = self.correct.saturating_add(1);
            self.consecutive_correct = self.consecutive_correct.saturating_add(1);
        } else {
            self.consecutive_correct = 0;
        }
        self.accuracy = accuracy_percent(self.correct, self.attempts);
        self.last_studied = Some(at);
    }

    pub(crate) fn set_schedule(
        &mut self,
        srs_level: u32,
        next_review: Option<DateTime<Utc>>,
        status: CardStatus,
    ) {
        self.srs_level = srs_level;
        self.next_review = next_review;
        self.status = status;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
