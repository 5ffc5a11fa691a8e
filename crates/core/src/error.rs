use thiserror::Error;

use crate::model::{CardStatsError, DrugCardError, ReviewError, SettingsError};
use crate::scheduler::SchedulerError;

/// Any error produced by the domain layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Card(#[from] DrugCardError),
    #[error(transparent)]
    Stats(#[from] CardStatsError),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
