use std::collections::BTreeMap;

use crate::filter::{StatsLookup, WEAK_ACCURACY_THRESHOLD};
use crate::model::DrugCard;

/// Mean accuracy of the attempted cards in one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryAccuracy {
    pub category: String,
    pub attempted_cards: usize,
    pub accuracy: f64,
}

/// Categories whose mean accuracy over attempted cards is below `threshold`.
///
/// Weakest first; ties are ordered by name. Categories without any attempted card
/// and cards without a category are skipped.
pub fn weak_categories<S>(deck: &[DrugCard], stats: &S, threshold: u8) -> Vec<CategoryAccuracy>
where
    S: StatsLookup + ?Sized,
{
    let mut totals: BTreeMap<&str, (usize, u32)> = BTreeMap::new();
    for card in deck.iter().filter(|card| !card.category.is_empty()) {
        let Some(card_stats) = stats.stats_for(&card.name) else {
            continue;
        };
        if card_stats.attempts() == 0 {
            continue;
        }
        let entry = totals.entry(card.category.as_str()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += u32::from(card_stats.accuracy());
    }

    let mut weak: Vec<CategoryAccuracy> = totals
        .into_iter()
        .map(|(category, (count, sum))| {
            #[allow(clippy::cast_precision_loss)]
            let accuracy = f64::from(sum) / count as f64;
            CategoryAccuracy {
                category: category.to_owned(),
                attempted_cards: count,
                accuracy,
            }
        })
        .filter(|entry| entry.accuracy < f64::from(threshold))
        .collect();

    weak.sort_by(|a, b| {
        a.accuracy
            .total_cmp(&b.accuracy)
            .then_with(|| a.category.cmp(&b.category))
    });
    weak
}

/// `weak_categories` with the same 70% threshold the weak study mode uses.
pub fn default_weak_categories<S>(deck: &[DrugCard], stats: &S) -> Vec<CategoryAccuracy>
where
    S: StatsLookup + ?Sized,
{
    weak_categories(deck, stats, WEAK_ACCURACY_THRESHOLD)
}
