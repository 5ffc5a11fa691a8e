//! Cancellable timers for the study screen.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use log::debug;
use tokio::task::JoinHandle;

/// Pause between answering and showing the next card. UI pacing only.
pub const ANSWER_PACING: StdDuration = StdDuration::from_millis(300);

//
// ─── TIMER SLOT ────────────────────────────────────────────────────────────────
//

/// Holds at most one running timer of a kind.
///
/// Starting a timer aborts the one already in the slot; dropping the slot aborts it too.
/// Must be used from inside a tokio runtime.
#[derive(Debug)]
pub struct TimerSlot {
    label: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl TimerSlot {
    #[must_use]
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            handle: None,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Run `task` once after `delay`.
    pub fn schedule<F>(&mut self, delay: StdDuration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    /// Call `tick` every `period` until it returns `ControlFlow::Break`.
    pub fn repeat<F>(&mut self, period: StdDuration, mut tick: F)
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // the first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if tick().is_break() {
                    break;
                }
            }
        }));
    }

    /// Abort the running timer, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                debug!("cancelling {} timer", self.label);
            }
            handle.abort();
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

//
// ─── SESSION COUNTDOWN ─────────────────────────────────────────────────────────
//

/// Time left in a timed study session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCountdown {
    started_at: DateTime<Utc>,
    duration: Duration,
}

impl SessionCountdown {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            started_at,
            duration,
        }
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Remaining time, never negative.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        let elapsed = now - self.started_at;
        (self.duration - elapsed).max(Duration::zero())
    }

    #[must_use]
    pub fn is_finished(&self, now: DateTime<Utc>) -> bool {
        self.remaining(now) == Duration::zero()
    }

    /// Remaining time as `m:ss`.
    #[must_use]
    pub fn format_remaining(&self, now: DateTime<Utc>) -> String {
        let secs = self.remaining(now).num_seconds();
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharma_core::time::fixed_now;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn countdown_clamps_and_formats() {
        let start = fixed_now();
        let countdown = SessionCountdown::new(start, Duration::minutes(10));

        assert_eq!(countdown.format_remaining(start), "10:00");
        assert_eq!(
            countdown.format_remaining(start + Duration::seconds(65)),
            "8:55"
        );
        assert!(!countdown.is_finished(start + Duration::seconds(599)));
        assert!(countdown.is_finished(start + Duration::minutes(11)));
        assert_eq!(
            countdown.remaining(start + Duration::hours(1)),
            Duration::zero()
        );
        assert_eq!(countdown.format_remaining(start + Duration::hours(1)), "0:00");
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_previous_timer() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut slot = TimerSlot::new("auto-advance");

        let first = Arc::clone(&fired);
        slot.schedule(StdDuration::from_secs(5), async move {
            first.fetch_add(1, Ordering::SeqCst);
        });
        let second = Arc::clone(&fired);
        slot.schedule(StdDuration::from_secs(5), async move {
            second.fetch_add(10, Ordering::SeqCst);
        });
        assert!(slot.is_active());

        tokio::time::sleep(StdDuration::from_secs(6)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 10);
        assert!(!slot.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_abort_the_timer() {
        let fired = Arc::new(AtomicUsize::new(0));

        let mut slot = TimerSlot::new("countdown");
        let seen = Arc::clone(&fired);
        slot.schedule(StdDuration::from_secs(1), async move {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        slot.cancel();
        assert!(!slot.is_active());

        let seen = Arc::clone(&fired);
        slot.schedule(StdDuration::from_secs(1), async move {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        drop(slot);

        tokio::time::sleep(StdDuration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_ticks_until_break() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut slot = TimerSlot::new("countdown");
        let seen = Arc::clone(&ticks);
        slot.repeat(StdDuration::from_secs(1), move || {
            if seen.fetch_add(1, Ordering::SeqCst) + 1 >= 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        tokio::time::sleep(StdDuration::from_millis(10_500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(!slot.is_active());
    }
}
