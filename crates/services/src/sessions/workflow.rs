use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, info};
use tokio::sync::{Mutex, oneshot};

use pharma_core::model::{Difficulty, DrugCard};

use crate::timers::{ANSWER_PACING, TimerSlot};

use super::controller::{AnswerOutcome, SessionController};

/// Result of answering a card inside the study loop.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub outcome: AnswerOutcome,
    pub next: Option<DrugCard>,
}

/// Runs the interactive loop around a [`SessionController`]: pacing between cards,
/// auto-advance after a revealed answer, and the session countdown.
///
/// The controller sits behind a mutex so timer tasks can act on it; every step finishes
/// its state change (and persistence) before the next card is drawn.
pub struct StudyLoop {
    controller: Arc<Mutex<SessionController>>,
    pacing: Duration,
    auto_advance: TimerSlot,
    session_timer: TimerSlot,
    session_over: Arc<AtomicBool>,
}

impl StudyLoop {
    #[must_use]
    pub fn new(controller: SessionController) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
            pacing: ANSWER_PACING,
            auto_advance: TimerSlot::new("auto-advance"),
            session_timer: TimerSlot::new("session"),
            session_over: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    #[must_use]
    pub fn controller(&self) -> Arc<Mutex<SessionController>> {
        Arc::clone(&self.controller)
    }

    /// Start the session countdown and draw the first card.
    pub async fn start(&mut self) -> Option<DrugCard> {
        self.restart_countdown().await;
        let mut ctl = self.controller.lock().await;
        ctl.next_card().await.cloned()
    }

    /// (Re)arm the session timer from the controller's countdown.
    pub async fn restart_countdown(&mut self) {
        let countdown = {
            let ctl = self.controller.lock().await;
            let now = ctl.clock().now();
            countdown_left(ctl.countdown().remaining(now))
        };

        self.session_over.store(false, Ordering::SeqCst);
        let flag = Arc::clone(&self.session_over);
        self.session_timer.schedule(countdown, async move {
            flag.store(true, Ordering::SeqCst);
            info!("study session time is up");
        });
    }

    #[must_use]
    pub fn is_session_over(&self) -> bool {
        self.session_over.load(Ordering::SeqCst)
    }

    /// Reveal the current answer and arm auto-advance if it is enabled.
    ///
    /// The auto-advance delay starts once the mechanism has been spoken.
    pub async fn reveal(&mut self) -> bool {
        let mut ctl = self.controller.lock().await;
        let Some(expected) = ctl.current_card().map(|card| card.name.clone()) else {
            return false;
        };
        let Some(secs) = ctl.settings().auto_advance_secs() else {
            return ctl.show_answer();
        };

        let (spoken_tx, spoken_rx) = oneshot::channel();
        let revealed = ctl.show_answer_then(Some(Box::new(move || {
            let _ = spoken_tx.send(());
        })));
        drop(ctl);

        let controller = Arc::clone(&self.controller);
        let delay = Duration::from_secs(u64::from(secs));
        self.auto_advance.schedule(Duration::ZERO, async move {
            if spoken_rx.await.is_err() {
                return;
            }
            tokio::time::sleep(delay).await;
            let mut ctl = controller.lock().await;
            let still_waiting = ctl.is_answer_shown()
                && ctl.current_card().is_some_and(|card| card.name == expected);
            if still_waiting {
                debug!("auto-advancing past {expected:?}");
                ctl.skip().await;
            }
        });
        revealed
    }

    /// Grade the current card, pause for pacing, then draw the next one.
    ///
    /// Returns `None` (and draws nothing) when no card is current.
    pub async fn answer_and_advance(&mut self, difficulty: Difficulty) -> Option<StepResult> {
        self.auto_advance.cancel();
        let outcome = {
            let mut ctl = self.controller.lock().await;
            ctl.answer(difficulty).await?
        };

        if !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }

        let mut ctl = self.controller.lock().await;
        let next = ctl.next_card().await.cloned();
        Some(StepResult { outcome, next })
    }

    /// Skip the current card without grading it.
    pub async fn skip(&mut self) -> Option<DrugCard> {
        self.auto_advance.cancel();
        let mut ctl = self.controller.lock().await;
        ctl.skip().await.cloned()
    }

    /// Undo the last answer; the restored card becomes current again.
    pub async fn undo(&mut self) -> bool {
        self.auto_advance.cancel();
        self.controller.lock().await.undo().await
    }

    /// Cancel all timers.
    pub fn stop(&mut self) {
        self.auto_advance.cancel();
        self.session_timer.cancel();
    }
}

fn countdown_left(remaining: chrono::Duration) -> Duration {
    remaining.to_std().unwrap_or(Duration::ZERO)
}
