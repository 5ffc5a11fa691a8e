use chrono::{DateTime, Duration, Utc};
use log::debug;
use thiserror::Error;

use crate::model::{AnswerLog, CardStats, CardStatus, Difficulty, RecentErrors};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("interval ladder cannot be empty")]
    EmptyLadder,
    #[error("interval ladder rungs must be positive and non-decreasing, got {0:?}")]
    InvalidLadder(Vec<u32>),
}

/// Review intervals in days, indexed by `srs_level` (clamped to the last rung).
pub const DEFAULT_LADDER_DAYS: [u32; 6] = [1, 3, 7, 14, 30, 60];

//
// ─── APPLIED ANSWER ────────────────────────────────────────────────────────────
//

/// What an answer did to a card's schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedAnswer {
    pub log: AnswerLog,
    pub correct: bool,
    pub interval: Duration,
    pub next_review: DateTime<Utc>,
    pub srs_level: u32,
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// Leveled-ladder scheduler with per-difficulty floors.
///
/// Each answer sets `next_review = now + interval`, where:
///
/// - `again`: the level drops to 0 and the interval is 1 minute.
/// - `hard`: the level is kept and the interval is 6 minutes.
/// - `good` / `easy`: the interval is the larger of the difficulty floor
///   (1 day / 4 days) and the ladder rung for the current level, then the level
///   goes up by one.
///
/// Any answer leaves the card in `Learning`. Cards can be demoted to `Review`
/// by hand with [`Scheduler::mark_for_review`].
///
/// # Examples
///
/// ```
/// # use pharma_core::scheduler::Scheduler;
/// # use pharma_core::model::{CardStats, Difficulty, RecentErrors};
/// let scheduler = Scheduler::new();
/// let mut stats = CardStats::default();
/// let mut errors = RecentErrors::new();
/// let now = chrono::Utc::now();
///
/// let applied = scheduler.answer("Warfarin", &mut stats, &mut errors, Difficulty::Good, now);
/// assert_eq!(applied.next_review, now + chrono::Duration::days(1));
/// assert_eq!(stats.srs_level(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduler {
    ladder_days: Vec<u32>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ladder_days: DEFAULT_LADDER_DAYS.to_vec(),
        }
    }

    /// Scheduler with a custom interval ladder.
    ///
    /// # Errors
    ///
    /// - `EmptyLadder` if no rungs are given
    /// - `InvalidLadder` if a rung is zero or smaller than the one before it
    pub fn try_with_ladder(ladder_days: Vec<u32>) -> Result<Self, SchedulerError> {
        if ladder_days.is_empty() {
            return Err(SchedulerError::EmptyLadder);
        }
        let ordered = ladder_days.windows(2).all(|pair| pair[0] <= pair[1]);
        if ladder_days[0] == 0 || !ordered {
            return Err(SchedulerError::InvalidLadder(ladder_days));
        }
        Ok(Self { ladder_days })
    }

    #[must_use]
    pub fn ladder_days(&self) -> &[u32] {
        &self.ladder_days
    }

    fn rung(&self, level: u32) -> Duration {
        let idx = usize::try_from(level)
            .unwrap_or(usize::MAX)
            .min(self.ladder_days.len() - 1);
        Duration::days(i64::from(self.ladder_days[idx]))
    }

    /// Delay before the card is due again after answering `difficulty` at `level`.
    #[must_use]
    pub fn interval(&self, difficulty: Difficulty, level: u32) -> Duration {
        let floor = Duration::minutes(difficulty.floor_minutes());
        if difficulty.is_correct() {
            floor.max(self.rung(level))
        } else {
            floor
        }
    }

    /// Apply an answer to a card's history.
    ///
    /// Updates attempts, accuracy, streak, level, status and next review time; a miss
    /// (`again` / `hard`) also moves `name` to the front of `recent_errors`.
    pub fn answer(
        &self,
        name: &str,
        stats: &mut CardStats,
        recent_errors: &mut RecentErrors,
        difficulty: Difficulty,
        now: DateTime<Utc>,
    ) -> AppliedAnswer {
        let correct = difficulty.is_correct();
        let level = stats.srs_level();
        let interval = self.interval(difficulty, level);
        let next_level = match difficulty {
            Difficulty::Again => 0,
            Difficulty::Hard => level,
            Difficulty::Good | Difficulty::Easy => level.saturating_add(1),
        };
        let next_review = now + interval;

        stats.record_attempt(correct, now);
        stats.set_schedule(next_level, Some(next_review), CardStatus::Learning);
        if !correct {
            recent_errors.push(name);
        }

        debug!(
            "scheduled {name:?}: {difficulty} at level {level} -> level {next_level}, due in {} min",
            interval.num_minutes()
        );

        AppliedAnswer {
            log: AnswerLog::new(name, difficulty, now),
            correct,
            interval,
            next_review,
            srs_level: next_level,
        }
    }

    /// Demote a card to `Review`: level 0 and no scheduled time.
    pub fn mark_for_review(&self, stats: &mut CardStats) {
        stats.set_schedule(0, None, CardStatus::Review);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn answer(stats: &mut CardStats, errors: &mut RecentErrors, d: Difficulty, at: DateTime<Utc>) -> AppliedAnswer {
        Scheduler::new().answer("Y", stats, errors, d, at)
    }

    #[test]
    fn again_then_easy_use_minute_floors() {
        let mut stats = CardStats::default();
        let mut errors = RecentErrors::new();
        let t = fixed_now();

        let applied = answer(&mut stats, &mut errors, Difficulty::Again, t);
        assert_eq!(stats.next_review(), Some(t + Duration::milliseconds(60_000)));
        assert_eq!(applied.next_review, t + Duration::minutes(1));

        let t2 = t + Duration::minutes(5);
        answer(&mut stats, &mut errors, Difficulty::Easy, t2);
        assert_eq!(
            stats.next_review(),
            Some(t2 + Duration::milliseconds(345_600_000))
        );
    }

    #[test]
    fn fresh_card_intervals_match_difficulty_table() {
        let s = Scheduler::new();
        assert_eq!(s.interval(Difficulty::Again, 0), Duration::minutes(1));
        assert_eq!(s.interval(Difficulty::Hard, 0), Duration::minutes(6));
        assert_eq!(s.interval(Difficulty::Good, 0), Duration::minutes(1_440));
        assert_eq!(s.interval(Difficulty::Easy, 0), Duration::minutes(5_760));
    }

    #[test]
    fn good_answers_climb_the_ladder() {
        let mut stats = CardStats::default();
        let mut errors = RecentErrors::new();
        let mut at = fixed_now();
        let mut intervals = Vec::new();

        for _ in 0..8 {
            let applied = answer(&mut stats, &mut errors, Difficulty::Good, at);
            intervals.push(applied.interval.num_days());
            at = applied.next_review;
        }

        assert_eq!(intervals, vec![1, 3, 7, 14, 30, 60, 60, 60]);
        assert_eq!(stats.srs_level(), 8);
        assert_eq!(stats.consecutive_correct(), 8);
        assert!(errors.is_empty());
    }

    #[test]
    fn easy_is_never_shorter_than_good() {
        let s = Scheduler::new();
        for level in 0..10 {
            assert!(s.interval(Difficulty::Easy, level) >= s.interval(Difficulty::Good, level));
        }
        assert_eq!(s.interval(Difficulty::Easy, 3), Duration::days(14));
    }

    #[test]
    fn again_resets_level_and_hard_keeps_it() {
        let mut stats = CardStats::default();
        let mut errors = RecentErrors::new();
        let now = fixed_now();
        answer(&mut stats, &mut errors, Difficulty::Good, now);
        answer(&mut stats, &mut errors, Difficulty::Good, now);
        assert_eq!(stats.srs_level(), 2);

        answer(&mut stats, &mut errors, Difficulty::Hard, now);
        assert_eq!(stats.srs_level(), 2);

        answer(&mut stats, &mut errors, Difficulty::Again, now);
        assert_eq!(stats.srs_level(), 0);
    }

    #[test]
    fn misses_feed_recent_errors_and_hits_do_not_evict() {
        let mut stats = CardStats::default();
        let mut errors = RecentErrors::new();
        errors.push("other");
        let now = fixed_now();

        for _ in 0..3 {
            answer(&mut stats, &mut errors, Difficulty::Again, now);
        }
        assert_eq!(stats.consecutive_correct(), 0);
        assert_eq!(errors.position("Y"), Some(0));
        assert_eq!(errors.len(), 2);

        answer(&mut stats, &mut errors, Difficulty::Good, now);
        assert_eq!(stats.consecutive_correct(), 1);
        assert!(errors.contains("Y"));
    }

    #[test]
    fn answer_updates_counts_and_status() {
        let mut stats = CardStats::default();
        let mut errors = RecentErrors::new();
        let now = fixed_now();

        let applied = answer(&mut stats, &mut errors, Difficulty::Hard, now);
        assert!(!applied.correct);
        assert_eq!(applied.log.difficulty, Difficulty::Hard);
        assert_eq!(stats.status(), CardStatus::Learning);
        assert_eq!(stats.attempts(), 1);
        assert_eq!(stats.correct(), 0);

        answer(&mut stats, &mut errors, Difficulty::Easy, now);
        assert_eq!(stats.accuracy(), 50);
        assert!(stats.next_review().unwrap() > now);
    }

    #[test]
    fn mark_for_review_clears_schedule() {
        let s = Scheduler::new();
        let mut stats = CardStats::default();
        let mut errors = RecentErrors::new();
        s.answer("Y", &mut stats, &mut errors, Difficulty::Good, fixed_now());
        s.answer("Y", &mut stats, &mut errors, Difficulty::Good, fixed_now());

        s.mark_for_review(&mut stats);
        assert_eq!(stats.status(), CardStatus::Review);
        assert_eq!(stats.srs_level(), 0);
        assert_eq!(stats.next_review(), None);
        assert_eq!(stats.attempts(), 2);

        s.answer("Y", &mut stats, &mut errors, Difficulty::Good, fixed_now());
        assert_eq!(stats.status(), CardStatus::Learning);
    }

    #[test]
    fn custom_ladder_validation() {
        assert_eq!(
            Scheduler::try_with_ladder(vec![]),
            Err(SchedulerError::EmptyLadder)
        );
        assert!(matches!(
            Scheduler::try_with_ladder(vec![0, 1]),
            Err(SchedulerError::InvalidLadder(_))
        ));
        assert!(matches!(
            Scheduler::try_with_ladder(vec![5, 2]),
            Err(SchedulerError::InvalidLadder(_))
        ));

        let s = Scheduler::try_with_ladder(vec![2, 10]).unwrap();
        assert_eq!(s.interval(Difficulty::Good, 0), Duration::days(2));
        assert_eq!(s.interval(Difficulty::Good, 9), Duration::days(10));
    }
}
