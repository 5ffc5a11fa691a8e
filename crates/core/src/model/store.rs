use std::collections::{BTreeSet, HashMap};

use log::warn;

use crate::model::card::DrugCard;
use crate::model::stats::CardStats;

/// The loaded deck plus the per-card study history.
///
/// Cards keep their load order; names are unique (first occurrence wins).
#[derive(Debug, Clone, Default)]
pub struct CardStore {
    cards: Vec<DrugCard>,
    index: HashMap<String, usize>,
    stats: HashMap<String, CardStats>,
}

impl CardStore {
    #[must_use]
    pub fn new(cards: impl IntoIterator<Item = DrugCard>) -> Self {
        let mut store = Self::default();
        store.add_cards(cards);
        store
    }

    /// Append cards whose names are not taken yet. Returns how many were added.
    pub fn add_cards(&mut self, cards: impl IntoIterator<Item = DrugCard>) -> usize {
        let mut added = 0;
        for card in cards {
            if self.index.contains_key(&card.name) {
                warn!("skipping duplicate card {:?}", card.name);
                continue;
            }
            self.index.insert(card.name.clone(), self.cards.len());
            self.cards.push(card);
            added += 1;
        }
        added
    }

    #[must_use]
    pub fn cards(&self) -> &[DrugCard] {
        &self.cards
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DrugCard> {
        self.index.get(name).map(|&i| &self.cards[i])
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Distinct non-empty categories, sorted.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        self.cards
            .iter()
            .map(|card| card.category.as_str())
            .filter(|category| !category.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    #[must_use]
    pub fn stats(&self, name: &str) -> Option<&CardStats> {
        self.stats.get(name)
    }

    #[must_use]
    pub fn stats_map(&self) -> &HashMap<String, CardStats> {
        &self.stats
    }

    /// Stats for `name`, created empty on first use.
    pub fn stats_entry(&mut self, name: &str) -> &mut CardStats {
        self.stats.entry(name.to_owned()).or_default()
    }

    /// Replace (or drop, with `None`) the stats of one card.
    pub fn replace_stats(&mut self, name: &str, stats: Option<CardStats>) {
        match stats {
            Some(stats) => {
                self.stats.insert(name.to_owned(), stats);
            }
            None => {
                self.stats.remove(name);
            }
        }
    }

    /// Load persisted history. Entries for cards outside the deck are kept so they
    /// survive deck edits.
    pub fn load_stats(&mut self, stats: HashMap<String, CardStats>) {
        self.stats = stats;
    }
}
