//! Narrowing the deck to the candidates of a study mode or a card filter.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{CardStats, CardStatus, CardStore, DrugCard, Importance, RecentErrors};

/// Cards below this accuracy count as weak.
pub const WEAK_ACCURACY_THRESHOLD: u8 = 70;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown study mode: {0:?}")]
pub struct UnknownModeError(pub String);

/// Which part of the deck a session draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyMode {
    /// The whole deck.
    #[default]
    Mixed,
    /// High-importance cards.
    Importance,
    /// Cards under 70% accuracy (unseen cards included) and cards flagged for review.
    Weak,
    /// Cards in the recent-errors log.
    Quick,
    /// Learning cards whose next review time has passed.
    Due,
}

impl StudyMode {
    pub const ALL: [StudyMode; 5] = [
        StudyMode::Mixed,
        StudyMode::Importance,
        StudyMode::Weak,
        StudyMode::Quick,
        StudyMode::Due,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StudyMode::Mixed => "mixed",
            StudyMode::Importance => "importance",
            StudyMode::Weak => "weak",
            StudyMode::Quick => "quick",
            StudyMode::Due => "due",
        }
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudyMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mixed" => Ok(StudyMode::Mixed),
            "importance" => Ok(StudyMode::Importance),
            "weak" => Ok(StudyMode::Weak),
            "quick" | "recent" => Ok(StudyMode::Quick),
            "due" | "review" => Ok(StudyMode::Due),
            _ => Err(UnknownModeError(s.to_owned())),
        }
    }
}

/// Ad-hoc filter that overrides the study mode while active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardFilter {
    Category(String),
    Search(String),
}

impl CardFilter {
    #[must_use]
    pub fn matches(&self, card: &DrugCard) -> bool {
        match self {
            CardFilter::Category(category) => card.category == *category,
            CardFilter::Search(query) => card.matches_query(query),
        }
    }
}

/// Read access to per-card history.
pub trait StatsLookup {
    fn stats_for(&self, name: &str) -> Option<&CardStats>;
}

impl StatsLookup for HashMap<String, CardStats> {
    fn stats_for(&self, name: &str) -> Option<&CardStats> {
        self.get(name)
    }
}

impl StatsLookup for CardStore {
    fn stats_for(&self, name: &str) -> Option<&CardStats> {
        self.stats(name)
    }
}

/// Candidates for the next draw.
///
/// Never empty unless the deck is empty: when the requested subset is empty the pool
/// holds the full deck and `fell_back` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePool<'a> {
    pub cards: Vec<&'a DrugCard>,
    pub fell_back: bool,
}

impl<'a> CandidatePool<'a> {
    fn or_full_deck(cards: Vec<&'a DrugCard>, deck: &'a [DrugCard]) -> Self {
        if cards.is_empty() && !deck.is_empty() {
            Self {
                cards: deck.iter().collect(),
                fell_back: true,
            }
        } else {
            Self {
                cards,
                fell_back: false,
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Whether `card` qualifies as weak given its history.
#[must_use]
pub fn is_weak(stats: Option<&CardStats>) -> bool {
    match stats {
        None => true,
        Some(stats) => {
            stats.status() == CardStatus::Review || stats.accuracy() < WEAK_ACCURACY_THRESHOLD
        }
    }
}

/// Candidates of `deck` for `mode` at time `now`.
///
/// Pure: the same inputs always give the same pool, in deck order.
pub fn filter_candidates<'a, S>(
    deck: &'a [DrugCard],
    mode: StudyMode,
    stats: &S,
    recent_errors: &RecentErrors,
    now: DateTime<Utc>,
) -> CandidatePool<'a>
where
    S: StatsLookup + ?Sized,
{
    let subset: Vec<&DrugCard> = match mode {
        StudyMode::Mixed => deck.iter().collect(),
        StudyMode::Importance => deck
            .iter()
            .filter(|card| card.importance == Importance::High)
            .collect(),
        StudyMode::Weak => deck
            .iter()
            .filter(|card| is_weak(stats.stats_for(&card.name)))
            .collect(),
        StudyMode::Quick => deck
            .iter()
            .filter(|card| recent_errors.contains(&card.name))
            .collect(),
        StudyMode::Due => deck
            .iter()
            .filter(|card| stats.stats_for(&card.name).is_some_and(|s| s.is_due(now)))
            .collect(),
    };

    CandidatePool::or_full_deck(subset, deck)
}

/// Candidates of `deck` matching a category or search filter.
pub fn filter_by<'a>(deck: &'a [DrugCard], filter: &CardFilter) -> CandidatePool<'a> {
    let subset = deck.iter().filter(|card| filter.matches(card)).collect();
    CandidatePool::or_full_deck(subset, deck)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
