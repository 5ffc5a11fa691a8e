use pharma_core::model::{StudySettings, StudySettingsDraft};
use storage::repository::StudyRepository;

use crate::error::SettingsServiceError;

#[derive(Clone)]
pub struct SettingsService {
    repo: StudyRepository,
}

impl SettingsService {
    #[must_use]
    pub fn new(repo: StudyRepository) -> Self {
        Self { repo }
    }

    /// Load persisted settings (or defaults if missing).
    ///
    /// # Errors
    ///
    /// Returns `SettingsServiceError` on storage failures.
    pub async fn load(&self) -> Result<StudySettings, SettingsServiceError> {
        Ok(self.repo.get_settings().await?)
    }

    /// Validate and persist new settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsServiceError` if validation fails or persistence fails.
    pub async fn save(
        &self,
        draft: StudySettingsDraft,
    ) -> Result<StudySettings, SettingsServiceError> {
        let settings = draft.validate()?;
        self.repo.set_settings(&settings).await?;
        Ok(settings)
    }
}
