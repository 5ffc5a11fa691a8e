//! Text-to-speech port.

use log::debug;

/// Callback fired once an utterance has finished (or was never started).
pub type Completion = Box<dyn FnOnce() + Send + 'static>;

/// Speaks text aloud.
///
/// Implementations must call `on_end` exactly once, including when speech is unavailable,
/// so that anything sequenced after an utterance still runs.
pub trait Speech: Send + Sync {
    fn speak(&self, text: &str, on_end: Option<Completion>);
}

/// Speech backend for environments without audio. Completes immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSpeech;

impl Speech for SilentSpeech {
    fn speak(&self, text: &str, on_end: Option<Completion>) {
        debug!("speech unavailable, skipping {text:?}");
        if let Some(on_end) = on_end {
            on_end();
        }
    }
}
