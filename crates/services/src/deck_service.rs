use std::collections::HashSet;
use std::path::Path;

use log::{info, warn};
use serde::Deserialize;

use pharma_core::model::{DrugCard, Importance};

use crate::error::DeckLoadError;

/// Raw deck contents and the format they are in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckSource<'a> {
    /// JSON array of card objects.
    Json(&'a str),
    /// Header-row table with the given field delimiter.
    Csv { text: &'a str, delimiter: u8 },
}

impl<'a> DeckSource<'a> {
    #[must_use]
    pub fn csv(text: &'a str) -> Self {
        Self::Csv {
            text,
            delimiter: b',',
        }
    }

    #[must_use]
    pub fn tsv(text: &'a str) -> Self {
        Self::Csv {
            text,
            delimiter: b'\t',
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            DeckSource::Json(_) => "json",
            DeckSource::Csv { .. } => "csv",
        }
    }
}

/// One table row; every column is optional text until validated.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CsvRow {
    name: Option<String>,
    category: Option<String>,
    importance: Option<String>,
    frequency: Option<String>,
    mechanism: Option<String>,
    indication: Option<String>,
    side_effects: Option<String>,
    #[serde(alias = "interaction")]
    interactions: Option<String>,
    contraindication: Option<String>,
    plus_alfa: Option<String>,
}

impl CsvRow {
    fn into_card(self) -> Result<DrugCard, pharma_core::model::DrugCardError> {
        let importance = match self.importance.as_deref().map(str::trim) {
            None | Some("") => Importance::default(),
            Some(text) => text.parse()?,
        };
        let frequency = self
            .frequency
            .as_deref()
            .and_then(|text| text.trim().parse::<f64>().ok());

        DrugCard {
            name: self.name.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            importance,
            frequency,
            mechanism: self.mechanism,
            indication: self.indication,
            side_effects: self.side_effects,
            interactions: self.interactions,
            contraindication: self.contraindication,
            plus_alfa: self.plus_alfa,
        }
        .validate()
    }
}

/// Parse a deck, skipping bad records.
///
/// Records without a name or with an unknown importance are dropped with a warning;
/// for duplicate names the first record wins.
///
/// # Errors
///
/// Returns `DeckLoadError` when the document as a whole cannot be read
/// (not a JSON array, unreadable table header).
pub fn parse_deck(source: DeckSource<'_>) -> Result<Vec<DrugCard>, DeckLoadError> {
    let parsed = match source {
        DeckSource::Json(text) => parse_json(text)?,
        DeckSource::Csv { text, delimiter } => parse_table(text, delimiter)?,
    };

    let mut seen = HashSet::with_capacity(parsed.len());
    let mut cards = Vec::with_capacity(parsed.len());
    for card in parsed {
        if seen.insert(card.name.clone()) {
            cards.push(card);
        } else {
            warn!("skipping duplicate deck card {:?}", card.name);
        }
    }

    info!("loaded {} cards from {} deck", cards.len(), source.kind());
    Ok(cards)
}

fn parse_json(text: &str) -> Result<Vec<DrugCard>, DeckLoadError> {
    let records: Vec<serde_json::Value> = serde_json::from_str(text)?;
    let mut cards = Vec::with_capacity(records.len());
    for (idx, record) in records.into_iter().enumerate() {
        let card = serde_json::from_value::<DrugCard>(record)
            .map_err(|err| err.to_string())
            .and_then(|card| card.validate().map_err(|err| err.to_string()));
        match card {
            Ok(card) => cards.push(card),
            Err(err) => warn!("skipping deck record {idx}: {err}"),
        }
    }
    Ok(cards)
}

fn parse_table(text: &str, delimiter: u8) -> Result<Vec<DrugCard>, DeckLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    reader.headers()?;

    let mut cards = Vec::new();
    for (idx, row) in reader.deserialize::<CsvRow>().enumerate() {
        let card = row
            .map_err(|err| err.to_string())
            .and_then(|row| row.into_card().map_err(|err| err.to_string()));
        match card {
            Ok(card) => cards.push(card),
            // header is line 1
            Err(err) => warn!("skipping deck row {}: {err}", idx + 2),
        }
    }
    Ok(cards)
}

/// Read a deck file, choosing the parser from the extension.
///
/// # Errors
///
/// Returns `DeckLoadError::Io` if the file cannot be read,
/// `DeckLoadError::UnsupportedFormat` for unknown extensions, and parse errors
/// from [`parse_deck`].
pub fn load_deck_file(path: &Path) -> Result<Vec<DrugCard>, DeckLoadError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let text = std::fs::read_to_string(path).map_err(|source| DeckLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match extension.as_str() {
        "json" => parse_deck(DeckSource::Json(&text)),
        "csv" => parse_deck(DeckSource::csv(&text)),
        "tsv" => parse_deck(DeckSource::tsv(&text)),
        _ => Err(DeckLoadError::UnsupportedFormat(extension)),
    }
}
