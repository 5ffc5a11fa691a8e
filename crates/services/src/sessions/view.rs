use pharma_core::filter::{CardFilter, StudyMode};
use pharma_core::model::{DrugCard, SessionStats};

/// One labelled line of a revealed answer.
///
/// Presentation-agnostic: the UI decides how to style and localize labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSection {
    pub label: &'static str,
    pub text: String,
}

impl AnswerSection {
    fn new(label: &'static str, text: &str) -> Self {
        Self {
            label,
            text: text.to_owned(),
        }
    }
}

/// Answer lines for `card`.
///
/// Micro-learning keeps the card short (action and indication); the full view adds side
/// effects, interactions and contraindications. Blank fields are skipped.
#[must_use]
pub fn answer_sections(card: &DrugCard, micro_learning: bool) -> Vec<AnswerSection> {
    let mechanism_label = if micro_learning { "Action" } else { "Mechanism" };
    let mut fields = vec![
        (mechanism_label, card.mechanism.as_deref()),
        ("Indication", card.indication.as_deref()),
    ];
    if !micro_learning {
        fields.extend([
            ("Side effects", card.side_effects.as_deref()),
            ("Interactions", card.interactions.as_deref()),
            ("Contraindication", card.contraindication.as_deref()),
        ]);
    }

    fields
        .into_iter()
        .filter_map(|(label, text)| {
            text.filter(|text| !text.trim().is_empty())
                .map(|text| AnswerSection::new(label, text))
        })
        .collect()
}

/// The `plusAlfa` extra, if the card has a non-blank one.
#[must_use]
pub fn extra_section(card: &DrugCard) -> Option<String> {
    card.plus_alfa
        .as_deref()
        .filter(|text| !text.trim().is_empty())
        .map(str::to_owned)
}

/// Everything the UI needs to draw the study screen.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub current: Option<DrugCard>,
    pub answer_shown: bool,
    /// Empty until the answer is revealed.
    pub answer_sections: Vec<AnswerSection>,
    pub extra: Option<String>,
    pub memo: String,
    pub stats: SessionStats,
    pub accuracy: u8,
    pub progress_percent: u8,
    pub mode: StudyMode,
    pub filter: Option<CardFilter>,
    /// The last draw found no card for the mode or filter and used the whole deck.
    pub fell_back: bool,
    pub total_cards: usize,
    pub can_undo: bool,
    /// Set when the deck could not be loaded; the UI shows it instead of a card.
    pub deck_error: Option<String>,
}
