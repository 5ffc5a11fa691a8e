mod card;
mod recent_errors;
mod review;
mod session;
mod settings;
mod stats;
mod store;

pub use card::{DEFAULT_FREQUENCY, DrugCard, DrugCardError, Importance};
pub use recent_errors::{RECENT_ERRORS_CAP, RecentErrors};
pub use review::{AnswerLog, Difficulty, ReviewError};
pub use session::{Credit, DayRollover, SessionStats, XP_PER_LEVEL};
pub use settings::{SettingsError, StudySettings, StudySettingsDraft};
pub use stats::{CardStats, CardStatsError, CardStatus, accuracy_percent};
pub use store::CardStore;
