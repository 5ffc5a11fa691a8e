#![forbid(unsafe_code)]

pub mod error;
pub mod filter;
pub mod insights;
pub mod model;
pub mod scheduler;
pub mod selector;
pub mod time;

pub use error::Error;
pub use time::Clock;
