use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Selection weight used when a card has no usable `frequency`.
pub const DEFAULT_FREQUENCY: f64 = 50.0;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DrugCardError {
    #[error("drug name cannot be empty")]
    EmptyName,

    #[error("unknown importance: {0:?}")]
    UnknownImportance(String),
}

//
// ─── IMPORTANCE ────────────────────────────────────────────────────────────────
//

/// Clinical importance tier of a drug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    #[default]
    Medium,
    Low,
}

impl Importance {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Importance::High => "high",
            Importance::Medium => "medium",
            Importance::Low => "low",
        }
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Importance {
    type Err = DrugCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Importance::High),
            "medium" => Ok(Importance::Medium),
            "low" => Ok(Importance::Low),
            _ => Err(DrugCardError::UnknownImportance(s.to_owned())),
        }
    }
}

//
// ─── DRUG CARD ─────────────────────────────────────────────────────────────────
//

/// One drug record of the deck. Identified by `name`; never mutated after loading.
///
/// Field names follow the deck file format (`sideEffects`, `plusAlfa`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugCard {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub importance: Importance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mechanism: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_effects: Option<String>,
    #[serde(default, alias = "interaction", skip_serializing_if = "Option::is_none")]
    pub interactions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contraindication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plus_alfa: Option<String>,
}

impl DrugCard {
    #[must_use]
    pub fn new(name: impl Into<String>, category: impl Into<String>, importance: Importance) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            importance,
            frequency: None,
            mechanism: None,
            indication: None,
            side_effects: None,
            interactions: None,
            contraindication: None,
            plus_alfa: None,
        }
    }

    #[must_use]
    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = Some(frequency);
        self
    }

    #[must_use]
    pub fn with_mechanism(mut self, mechanism: impl Into<String>) -> Self {
        self.mechanism = Some(mechanism.into());
        self
    }

    #[must_use]
    pub fn with_indication(mut self, indication: impl Into<String>) -> Self {
        self.indication = Some(indication.into());
        self
    }

    /// Normalize a freshly parsed record.
    ///
    /// Trims the name and category and turns blank text fields into `None`.
    ///
    /// # Errors
    ///
    /// Returns `DrugCardError::EmptyName` if the name is blank.
    pub fn validate(mut self) -> Result<Self, DrugCardError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DrugCardError::EmptyName);
        }
        self.name = name.to_owned();
        self.category = self.category.trim().to_owned();

        for field in [
            &mut self.mechanism,
            &mut self.indication,
            &mut self.side_effects,
            &mut self.interactions,
            &mut self.contraindication,
            &mut self.plus_alfa,
        ] {
            if field.as_deref().is_some_and(|text| text.trim().is_empty()) {
                *field = None;
            }
        }

        Ok(self)
    }

    /// Selection weight: `frequency` when positive and finite, otherwise 50.
    #[must_use]
    pub fn weight(&self) -> f64 {
        match self.frequency {
            Some(f) if f.is_finite() && f > 0.0 => f,
            _ => DEFAULT_FREQUENCY,
        }
    }

    /// Case-insensitive substring match over name, category, mechanism and indication.
    #[must_use]
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [
            Some(self.name.as_str()),
            Some(self.category.as_str()),
            self.mechanism.as_deref(),
            self.indication.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
