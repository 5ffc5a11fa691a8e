use std::path::Path;

use log::warn;

use storage::repository::StudyRepository;

use crate::Clock;
use crate::card_service::CardService;
use crate::deck_service::load_deck_file;
use crate::error::AppServicesError;
use crate::sessions::SessionBuilder;
use crate::settings_service::SettingsService;

/// Assembles app-facing services over one repository.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    repo: StudyRepository,
    card_service: CardService,
    settings: SettingsService,
}

impl AppServices {
    #[must_use]
    pub fn new(clock: Clock, repo: StudyRepository) -> Self {
        Self {
            clock,
            card_service: CardService::new(repo.clone()),
            settings: SettingsService::new(repo.clone()),
            repo,
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let repo = StudyRepository::sqlite(db_url).await?;
        Ok(Self::new(clock, repo))
    }

    /// Services over a throwaway in-memory store.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::new(clock, StudyRepository::in_memory())
    }

    /// Session builder with the deck at `deck_path` loaded.
    ///
    /// A deck that fails to load is logged and yields a session in the "no deck" state.
    #[must_use]
    pub fn session_for_deck(&self, deck_path: &Path) -> SessionBuilder {
        let deck = load_deck_file(deck_path);
        if let Err(err) = &deck {
            warn!("could not load deck {}: {err}", deck_path.display());
        }
        SessionBuilder::new(self.repo.clone())
            .with_clock(self.clock)
            .with_deck_result(deck)
    }

    #[must_use]
    pub fn repository(&self) -> &StudyRepository {
        &self.repo
    }

    #[must_use]
    pub fn card_service(&self) -> &CardService {
        &self.card_service
    }

    #[must_use]
    pub fn settings(&self) -> &SettingsService {
        &self.settings
    }
}
