use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::review::Difficulty;
use crate::model::stats::accuracy_percent;

/// XP needed to leave `level` is `level * XP_PER_LEVEL`.
pub const XP_PER_LEVEL: u32 = 50;

/// How the calendar moved between the last study day and today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayRollover {
    /// Already studied today.
    SameDay,
    /// Last studied yesterday; the streak grew.
    Continued,
    /// First study day, or a gap of more than a day; the streak restarted.
    Restarted,
}

/// Running totals shown in the header of the study screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionStats {
    pub today_studied: u32,
    pub correct_answers: u32,
    pub total_answers: u32,
    pub streak: u32,
    pub level: u32,
    pub xp: u32,
    pub last_study_date: Option<NaiveDate>,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            today_studied: 0,
            correct_answers: 0,
            total_answers: 0,
            streak: 0,
            level: 1,
            xp: 0,
            last_study_date: None,
        }
    }
}

/// Outcome of crediting one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credit {
    pub xp_gained: u32,
    pub leveled_up: bool,
    pub rollover: DayRollover,
}

impl SessionStats {
    /// Today's accuracy over answered cards, `0` when nothing was answered.
    #[must_use]
    pub fn accuracy(&self) -> u8 {
        accuracy_percent(self.correct_answers, self.total_answers)
    }

    /// Bring stale counters up to date when a session opens.
    ///
    /// Daily counters are cleared when the last study day is not today. A streak whose
    /// last day is older than yesterday is shown as broken. The stored study date is
    /// left alone so the next answer can still detect a continued streak.
    pub fn refresh_for(&mut self, today: NaiveDate) {
        match self.last_study_date {
            Some(last) if last == today => {}
            Some(last) if Some(last) == today.pred_opt() => self.reset_daily(),
            _ => {
                self.reset_daily();
                self.streak = 0;
            }
        }
    }

    /// Mark `today` as a study day, updating the streak.
    pub fn roll_into(&mut self, today: NaiveDate) -> DayRollover {
        let rollover = match self.last_study_date {
            Some(last) if last == today => DayRollover::SameDay,
            Some(last) if Some(last) == today.pred_opt() => {
                self.streak = self.streak.saturating_add(1);
                DayRollover::Continued
            }
            _ => {
                self.streak = 1;
                DayRollover::Restarted
            }
        };
        if rollover != DayRollover::SameDay {
            self.reset_daily();
        }
        // a streak of 0 can survive `refresh_for`; studying today counts
        self.streak = self.streak.max(1);
        self.last_study_date = Some(today);
        rollover
    }

    /// Count one answer given on `today`.
    pub fn credit(&mut self, difficulty: Difficulty, today: NaiveDate) -> Credit {
        let rollover = self.roll_into(today);

        self.today_studied = self.today_studied.saturating_add(1);
        self.total_answers = self.total_answers.saturating_add(1);
        if difficulty.is_correct() {
            self.correct_answers = self.correct_answers.saturating_add(1);
        }

        let xp_gained = difficulty.xp();
        self.xp = self.xp.saturating_add(xp_gained);
        self.level = self.level.max(1);

        let mut leveled_up = false;
        // persisted levels are untrusted; the threshold saturates instead of wrapping
        loop {
            let threshold = self.level.saturating_mul(XP_PER_LEVEL);
            if self.xp < threshold {
                break;
            }
            self.xp -= threshold;
            self.level = self.level.saturating_add(1);
            leveled_up = true;
        }

        Credit {
            xp_gained,
            leveled_up,
            rollover,
        }
    }

    /// Progress toward the daily goal, clamped to 100.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn progress_percent(&self, daily_goal: u32) -> u8 {
        if daily_goal == 0 {
            return 100;
        }
        let pct = f64::from(self.today_studied) / f64::from(daily_goal) * 100.0;
        pct.min(100.0) as u8
    }

    fn reset_daily(&mut self) {
        self.today_studied = 0;
        self.correct_answers = 0;
        self.total_answers = 0;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
