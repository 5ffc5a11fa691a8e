use async_trait::async_trait;
use log::warn;
use pharma_core::model::{CardStats, DrugCard, RecentErrors, SessionStats, StudySettings};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Key layout of the study data.
pub mod keys {
    pub const SESSION_STATS: &str = "session_stats";
    pub const RECENT_ERRORS: &str = "recent_errors";
    pub const SETTINGS: &str = "settings";
    pub const CUSTOM_CARDS: &str = "custom_cards";
    pub const CARD_STATS_PREFIX: &str = "stats_";
    pub const MEMO_PREFIX: &str = "memo_";

    #[must_use]
    pub fn card_stats(name: &str) -> String {
        format!("{CARD_STATS_PREFIX}{name}")
    }

    #[must_use]
    pub fn memo(name: &str) -> String {
        format!("{MEMO_PREFIX}{name}")
    }
}

/// String key-value store the study data lives in.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// All entries whose key starts with `prefix`, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn entries_with_prefix(&self, prefix: &str)
    -> Result<Vec<(String, String)>, StorageError>;
}

/// Simple in-memory store for tests and sessions that should not persist.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }

    async fn entries_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<Vec<(String, String)>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .range(prefix.to_owned()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

/// Typed access to study data on top of any `KeyValueStore`.
///
/// Missing entries read as `None` or the documented default. Entries that fail to
/// parse are logged and treated as missing, so corrupt data never stops a session.
#[derive(Clone)]
pub struct StudyRepository {
    store: Arc<dyn KeyValueStore>,
}

impl StudyRepository {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    async fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!("ignoring corrupt entry {key:?}: {err}");
                Ok(None)
            }
        }
    }

    async fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw =
            serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.set(key, &raw).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn get_card_stats(&self, name: &str) -> Result<Option<CardStats>, StorageError> {
        self.load_json(&keys::card_stats(name)).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the stats cannot be stored.
    pub async fn set_card_stats(&self, name: &str, stats: &CardStats) -> Result<(), StorageError> {
        self.save_json(&keys::card_stats(name), stats).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    pub async fn remove_card_stats(&self, name: &str) -> Result<(), StorageError> {
        self.store.remove(&keys::card_stats(name)).await
    }

    /// Every stored card history, keyed by card name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn load_all_card_stats(&self) -> Result<HashMap<String, CardStats>, StorageError> {
        let entries = self
            .store
            .entries_with_prefix(keys::CARD_STATS_PREFIX)
            .await?;

        let mut stats = HashMap::with_capacity(entries.len());
        for (key, raw) in entries {
            let name = &key[keys::CARD_STATS_PREFIX.len()..];
            match serde_json::from_str::<CardStats>(&raw) {
                Ok(parsed) => {
                    stats.insert(name.to_owned(), parsed);
                }
                Err(err) => warn!("ignoring corrupt stats for {name:?}: {err}"),
            }
        }
        Ok(stats)
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn get_session_stats(&self) -> Result<SessionStats, StorageError> {
        Ok(self
            .load_json(keys::SESSION_STATS)
            .await?
            .unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the stats cannot be stored.
    pub async fn set_session_stats(&self, stats: &SessionStats) -> Result<(), StorageError> {
        self.save_json(keys::SESSION_STATS, stats).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn get_recent_errors(&self) -> Result<RecentErrors, StorageError> {
        Ok(self
            .load_json(keys::RECENT_ERRORS)
            .await?
            .unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the list cannot be stored.
    pub async fn set_recent_errors(&self, errors: &RecentErrors) -> Result<(), StorageError> {
        self.save_json(keys::RECENT_ERRORS, errors).await
    }

    /// Stored settings, or defaults when missing or invalid.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn get_settings(&self) -> Result<StudySettings, StorageError> {
        Ok(self.load_json(keys::SETTINGS).await?.unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the settings cannot be stored.
    pub async fn set_settings(&self, settings: &StudySettings) -> Result<(), StorageError> {
        self.save_json(keys::SETTINGS, settings).await
    }

    /// Memo for a card; empty when none was written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn get_memo(&self, name: &str) -> Result<String, StorageError> {
        Ok(self.store.get(&keys::memo(name)).await?.unwrap_or_default())
    }

    /// Store a memo; blank text deletes it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    pub async fn set_memo(&self, name: &str, text: &str) -> Result<(), StorageError> {
        let key = keys::memo(name);
        if text.trim().is_empty() {
            self.store.remove(&key).await
        } else {
            self.store.set(&key, text).await
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn get_custom_cards(&self) -> Result<Vec<DrugCard>, StorageError> {
        Ok(self
            .load_json(keys::CUSTOM_CARDS)
            .await?
            .unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the cards cannot be stored.
    pub async fn set_custom_cards(&self, cards: &[DrugCard]) -> Result<(), StorageError> {
        self.save_json(keys::CUSTOM_CARDS, cards).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharma_core::model::{Difficulty, Importance, StudySettingsDraft};
    use pharma_core::scheduler::Scheduler;
    use pharma_core::time::fixed_now;

    fn answered_stats() -> CardStats {
        let mut stats = CardStats::default();
        let mut errors = RecentErrors::new();
        Scheduler::new().answer("Aspirin", &mut stats, &mut errors, Difficulty::Good, fixed_now());
        stats
    }

    #[tokio::test]
    async fn card_stats_round_trip() {
        let repo = StudyRepository::in_memory();
        assert_eq!(repo.get_card_stats("Aspirin").await.unwrap(), None);

        let stats = answered_stats();
        repo.set_card_stats("Aspirin", &stats).await.unwrap();
        assert_eq!(repo.get_card_stats("Aspirin").await.unwrap(), Some(stats));

        repo.remove_card_stats("Aspirin").await.unwrap();
        assert_eq!(repo.get_card_stats("Aspirin").await.unwrap(), None);
    }

    #[tokio::test]
    async fn load_all_reads_only_stats_keys_and_skips_corrupt() {
        let store = InMemoryStore::new();
        let repo = StudyRepository::new(Arc::new(store.clone()));
        repo.set_card_stats("Aspirin", &answered_stats()).await.unwrap();
        repo.set_card_stats("Heparin", &CardStats::default()).await.unwrap();
        store.set(&keys::card_stats("Broken"), "{not json").await.unwrap();
        repo.set_memo("Aspirin", "take with food").await.unwrap();

        let all = repo.load_all_card_stats().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["Aspirin"].attempts(), 1);
        assert!(all.contains_key("Heparin"));
    }

    #[tokio::test]
    async fn corrupt_documents_fall_back_to_defaults() {
        let store = InMemoryStore::new();
        let repo = StudyRepository::new(Arc::new(store.clone()));
        store.set(keys::SESSION_STATS, "[1,2").await.unwrap();
        store.set(keys::SETTINGS, r#"{"dailyGoal": 0}"#).await.unwrap();
        store.set(keys::RECENT_ERRORS, "42").await.unwrap();
        store.set(keys::CUSTOM_CARDS, "{}").await.unwrap();

        assert_eq!(repo.get_session_stats().await.unwrap(), SessionStats::default());
        assert_eq!(repo.get_settings().await.unwrap(), StudySettings::default());
        assert!(repo.get_recent_errors().await.unwrap().is_empty());
        assert!(repo.get_custom_cards().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn session_stats_and_settings_round_trip() {
        let repo = StudyRepository::in_memory();
        let mut stats = SessionStats::default();
        stats.credit(Difficulty::Easy, fixed_now().date_naive());
        repo.set_session_stats(&stats).await.unwrap();
        assert_eq!(repo.get_session_stats().await.unwrap(), stats);

        let mut draft = StudySettingsDraft::new();
        draft.speech_enabled = true;
        let settings = draft.validate().unwrap();
        repo.set_settings(&settings).await.unwrap();
        assert_eq!(repo.get_settings().await.unwrap(), settings);
    }

    #[tokio::test]
    async fn blank_memo_deletes_entry() {
        let store = InMemoryStore::new();
        let repo = StudyRepository::new(Arc::new(store.clone()));
        assert_eq!(repo.get_memo("Aspirin").await.unwrap(), "");

        repo.set_memo("Aspirin", "Reye syndrome in children").await.unwrap();
        assert_eq!(repo.get_memo("Aspirin").await.unwrap(), "Reye syndrome in children");

        repo.set_memo("Aspirin", "  ").await.unwrap();
        assert_eq!(store.get(&keys::memo("Aspirin")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn custom_cards_and_recent_errors_round_trip() {
        let repo = StudyRepository::in_memory();
        let cards = vec![DrugCard::new("Custom", "Mine", Importance::High).with_frequency(90.0)];
        repo.set_custom_cards(&cards).await.unwrap();
        assert_eq!(repo.get_custom_cards().await.unwrap(), cards);

        let mut errors = RecentErrors::new();
        errors.push("Custom");
        repo.set_recent_errors(&errors).await.unwrap();
        assert_eq!(repo.get_recent_errors().await.unwrap(), errors);
    }

    #[tokio::test]
    async fn prefix_scan_is_ordered_and_bounded() {
        let store = InMemoryStore::new();
        store.set("stats_b", "1").await.unwrap();
        store.set("stats_a", "2").await.unwrap();
        store.set("statz", "3").await.unwrap();
        store.set("memo_a", "4").await.unwrap();

        let keys: Vec<String> = store
            .entries_with_prefix("stats_")
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["stats_a", "stats_b"]);
    }
}
