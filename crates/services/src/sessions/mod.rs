mod controller;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{AnswerOutcome, SessionBuilder, SessionController};
pub use view::{AnswerSection, SessionSnapshot, answer_sections, extra_section};
pub use workflow::{StepResult, StudyLoop};
