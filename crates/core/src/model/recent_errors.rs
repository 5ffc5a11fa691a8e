use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Maximum number of names kept in the recent-errors log.
pub const RECENT_ERRORS_CAP: usize = 10;

/// Most-recent-first log of missed card names, deduplicated and bounded.
///
/// Drives the "quick" study mode. A correct answer does not evict a name;
/// only `remove` and `clear` do.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct RecentErrors {
    names: VecDeque<String>,
}

impl RecentErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `name` to the front, dropping the oldest entry past the cap.
    pub fn push(&mut self, name: &str) {
        self.names.retain(|existing| existing != name);
        self.names.push_front(name.to_owned());
        self.names.truncate(RECENT_ERRORS_CAP);
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.names.len();
        self.names.retain(|existing| existing != name);
        self.names.len() != before
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|existing| existing == name)
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|existing| existing == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl From<Vec<String>> for RecentErrors {
    fn from(names: Vec<String>) -> Self {
        // stored lists may predate the cap or contain duplicates; replay oldest-first
        let mut errors = Self::new();
        for name in names.iter().rev() {
            errors.push(name);
        }
        errors
    }
}

impl From<RecentErrors> for Vec<String> {
    fn from(errors: RecentErrors) -> Self {
        errors.names.into_iter().collect()
    }
}
