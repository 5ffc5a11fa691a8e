use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("session length must be between 1 and 180 minutes, got {0}")]
    InvalidSessionMinutes(u32),

    #[error("daily goal must be > 0")]
    InvalidDailyGoal,

    #[error("auto advance must be between 1 and 600 seconds, got {0}")]
    InvalidAutoAdvanceSecs(u32),
}

/// User preferences for the study screen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StudySettingsDraft", into = "StudySettingsDraft")]
pub struct StudySettings {
    session_minutes: u32,
    micro_learning: bool,
    speech_enabled: bool,
    daily_goal: u32,
    auto_advance_secs: Option<u32>,
}

/// Unvalidated settings, also the persisted shape.
///
/// Every field has a default so older or partial documents still load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudySettingsDraft {
    pub session_minutes: u32,
    pub micro_learning: bool,
    pub speech_enabled: bool,
    pub daily_goal: u32,
    pub auto_advance_secs: Option<u32>,
}

impl Default for StudySettingsDraft {
    fn default() -> Self {
        Self {
            session_minutes: 10,
            micro_learning: true,
            speech_enabled: false,
            daily_goal: 20,
            auto_advance_secs: None,
        }
    }
}

impl StudySettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the draft into settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` when a value is out of range.
    pub fn validate(self) -> Result<StudySettings, SettingsError> {
        if !(1..=180).contains(&self.session_minutes) {
            return Err(SettingsError::InvalidSessionMinutes(self.session_minutes));
        }
        if self.daily_goal == 0 {
            return Err(SettingsError::InvalidDailyGoal);
        }
        if let Some(secs) = self.auto_advance_secs {
            if !(1..=600).contains(&secs) {
                return Err(SettingsError::InvalidAutoAdvanceSecs(secs));
            }
        }

        Ok(StudySettings {
            session_minutes: self.session_minutes,
            micro_learning: self.micro_learning,
            speech_enabled: self.speech_enabled,
            daily_goal: self.daily_goal,
            auto_advance_secs: self.auto_advance_secs,
        })
    }
}

impl TryFrom<StudySettingsDraft> for StudySettings {
    type Error = SettingsError;

    fn try_from(draft: StudySettingsDraft) -> Result<Self, Self::Error> {
        draft.validate()
    }
}

impl From<StudySettings> for StudySettingsDraft {
    fn from(settings: StudySettings) -> Self {
        settings.to_draft()
    }
}

impl StudySettings {
    #[must_use]
    pub fn session_minutes(&self) -> u32 {
        self.session_minutes
    }

    #[must_use]
    pub fn session_length(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.session_minutes))
    }

    /// Show only mechanism and indication on the answer side.
    #[must_use]
    pub fn micro_learning(&self) -> bool {
        self.micro_learning
    }

    #[must_use]
    pub fn speech_enabled(&self) -> bool {
        self.speech_enabled
    }

    #[must_use]
    pub fn daily_goal(&self) -> u32 {
        self.daily_goal
    }

    #[must_use]
    pub fn auto_advance_secs(&self) -> Option<u32> {
        self.auto_advance_secs
    }

    /// Editable copy for a settings form.
    #[must_use]
    pub fn to_draft(&self) -> StudySettingsDraft {
        StudySettingsDraft {
            session_minutes: self.session_minutes,
            micro_learning: self.micro_learning,
            speech_enabled: self.speech_enabled,
            daily_goal: self.daily_goal,
            auto_advance_secs: self.auto_advance_secs,
        }
    }
}

impl Default for StudySettings {
    fn default() -> Self {
        Self {
            session_minutes: 10,
            micro_learning: true,
            speech_enabled: false,
            daily_goal: 20,
            auto_advance_secs: None,
        }
    }
}
