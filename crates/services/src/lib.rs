#![forbid(unsafe_code)]

pub mod app_services;
pub mod card_service;
pub mod deck_service;
pub mod error;
pub mod sessions;
pub mod settings_service;
pub mod speech;
pub mod timers;

pub use pharma_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use card_service::CardService;
pub use deck_service::{DeckSource, load_deck_file, parse_deck};
pub use error::{AppServicesError, CardServiceError, DeckLoadError, SessionError, SettingsServiceError};
pub use sessions::{
    AnswerOutcome, AnswerSection, SessionBuilder, SessionController, SessionSnapshot, StepResult,
    StudyLoop,
};
pub use settings_service::SettingsService;
pub use speech::{Completion, SilentSpeech, Speech};
pub use timers::{ANSWER_PACING, SessionCountdown, TimerSlot};
