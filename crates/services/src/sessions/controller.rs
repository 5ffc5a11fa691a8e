use std::sync::Arc;

use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use pharma_core::Clock;
use pharma_core::filter::{CardFilter, StudyMode, filter_by, filter_candidates};
use pharma_core::insights::{CategoryAccuracy, default_weak_categories};
use pharma_core::model::{
    CardStats, CardStore, Credit, DayRollover, Difficulty, DrugCard, RecentErrors, SessionStats,
    StudySettings, StudySettingsDraft,
};
use pharma_core::scheduler::{AppliedAnswer, Scheduler};
use pharma_core::selector::select_weighted;
use storage::repository::{StorageError, StudyRepository};

use crate::error::{DeckLoadError, SessionError};
use crate::speech::{Completion, SilentSpeech, Speech};
use crate::timers::SessionCountdown;

use super::view::{SessionSnapshot, answer_sections, extra_section};

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// What answering the current card did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub applied: AppliedAnswer,
    pub credit: Credit,
    pub session: SessionStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CurrentCard {
    name: String,
    answer_shown: bool,
    memo: String,
}

/// State before the last answer, restored verbatim by `undo`.
#[derive(Debug, Clone)]
struct UndoSnapshot {
    card_name: String,
    card_stats: Option<CardStats>,
    session: SessionStats,
    recent_errors: RecentErrors,
}

//
// ─── BUILDER ───────────────────────────────────────────────────────────────────
//

/// Collects the collaborators of a [`SessionController`].
pub struct SessionBuilder {
    repo: StudyRepository,
    clock: Clock,
    rng: StdRng,
    speech: Arc<dyn Speech>,
    scheduler: Scheduler,
    deck: Result<Vec<DrugCard>, String>,
    mode: StudyMode,
}

impl SessionBuilder {
    #[must_use]
    pub fn new(repo: StudyRepository) -> Self {
        Self {
            repo,
            clock: Clock::default(),
            rng: StdRng::from_os_rng(),
            speech: Arc::new(SilentSpeech),
            scheduler: Scheduler::new(),
            deck: Ok(Vec::new()),
            mode: StudyMode::default(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        self.with_rng(StdRng::seed_from_u64(seed))
    }

    #[must_use]
    pub fn with_speech(mut self, speech: Arc<dyn Speech>) -> Self {
        self.speech = speech;
        self
    }

    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: StudyMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_deck(mut self, cards: Vec<DrugCard>) -> Self {
        self.deck = Ok(cards);
        self
    }

    /// Use the result of loading the deck; a failure puts the session in the "no deck" state.
    #[must_use]
    pub fn with_deck_result(mut self, result: Result<Vec<DrugCard>, DeckLoadError>) -> Self {
        self.deck = result.map_err(|err| err.to_string());
        self
    }

    /// Load persisted study data and build the controller.
    ///
    /// Storage failures are logged and replaced with defaults.
    pub async fn open(self) -> SessionController {
        let repo = self.repo;
        let settings = best_effort_read("settings", repo.get_settings().await);
        let mut session = best_effort_read("session stats", repo.get_session_stats().await);
        let recent_errors = best_effort_read("recent errors", repo.get_recent_errors().await);
        let stats = best_effort_read("card stats", repo.load_all_card_stats().await);

        let (mut store, deck_error) = match self.deck {
            Ok(cards) => {
                let mut store = CardStore::new(cards);
                let custom = best_effort_read("custom cards", repo.get_custom_cards().await)
                    .into_iter()
                    .filter_map(|card| match card.validate() {
                        Ok(card) => Some(card),
                        Err(err) => {
                            warn!("skipping stored custom card: {err}");
                            None
                        }
                    });
                let added = store.add_cards(custom);
                if added > 0 {
                    info!("merged {added} custom cards into the deck");
                }
                (store, None)
            }
            Err(err) => {
                warn!("deck unavailable: {err}");
                (CardStore::default(), Some(err))
            }
        };
        store.load_stats(stats);

        let now = self.clock.now();
        session.refresh_for(now.date_naive());
        let countdown = SessionCountdown::new(now, settings.session_length());

        SessionController {
            repo,
            clock: self.clock,
            rng: self.rng,
            speech: self.speech,
            scheduler: self.scheduler,
            store,
            deck_error,
            session,
            recent_errors,
            settings,
            mode: self.mode,
            filter: None,
            fell_back: false,
            current: None,
            undo: None,
            countdown,
        }
    }
}

fn best_effort_read<T: Default>(what: &str, result: Result<T, StorageError>) -> T {
    result.unwrap_or_else(|err| {
        warn!("failed to load {what}, using defaults: {err}");
        T::default()
    })
}

fn best_effort_write(what: &str, result: Result<(), StorageError>) {
    if let Err(err) = result {
        warn!("failed to persist {what}: {err}");
    }
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Drives one study session: pick a card, reveal, answer, schedule, repeat.
///
/// Owns all mutable study state. At most one card is current at a time; answering
/// clears it until the next draw. Writes to storage are best-effort: failures are
/// logged and the session keeps going with its in-memory state.
pub struct SessionController {
    repo: StudyRepository,
    clock: Clock,
    rng: StdRng,
    speech: Arc<dyn Speech>,
    scheduler: Scheduler,
    store: CardStore,
    deck_error: Option<String>,
    session: SessionStats,
    recent_errors: RecentErrors,
    settings: StudySettings,
    mode: StudyMode,
    filter: Option<CardFilter>,
    fell_back: bool,
    current: Option<CurrentCard>,
    undo: Option<UndoSnapshot>,
    countdown: SessionCountdown,
}

impl SessionController {
    #[must_use]
    pub fn builder(repo: StudyRepository) -> SessionBuilder {
        SessionBuilder::new(repo)
    }

    // ─── draw ──────────────────────────────────────────────────────────────

    /// Draw the next card for the active filter (or mode) and make it current.
    ///
    /// Returns `None` when there is nothing to show: no deck, or an empty one.
    pub async fn next_card(&mut self) -> Option<&DrugCard> {
        if self.deck_error.is_some() {
            self.current = None;
            return None;
        }

        let now = self.clock.now();
        let pool = match &self.filter {
            Some(filter) => filter_by(self.store.cards(), filter),
            None => filter_candidates(
                self.store.cards(),
                self.mode,
                &self.store,
                &self.recent_errors,
                now,
            ),
        };
        let fell_back = pool.fell_back;
        let picked = select_weighted(&pool.cards, &mut self.rng).map(|card| card.name.clone());

        self.fell_back = fell_back;
        let Some(name) = picked else {
            debug!("no card to draw (mode {})", self.mode);
            self.current = None;
            return None;
        };

        debug!(
            "selected {name:?} (mode {}, filter {:?}, fell back: {fell_back})",
            self.mode, self.filter
        );
        let memo = self.load_memo(&name).await;
        self.announce(&name, None);
        self.current = Some(CurrentCard {
            name,
            answer_shown: false,
            memo,
        });
        self.current_card()
    }

    /// Drop the current card without answering and draw another.
    pub async fn skip(&mut self) -> Option<&DrugCard> {
        self.undo = None;
        self.next_card().await
    }

    #[must_use]
    pub fn current_card(&self) -> Option<&DrugCard> {
        self.current
            .as_ref()
            .and_then(|current| self.store.get(&current.name))
    }

    #[must_use]
    pub fn is_answer_shown(&self) -> bool {
        self.current.as_ref().is_some_and(|c| c.answer_shown)
    }

    /// Reveal the answer of the current card. Returns `false` when no card is current.
    pub fn show_answer(&mut self) -> bool {
        self.show_answer_then(None)
    }

    /// Reveal the answer and run `on_spoken` once the mechanism has been read out.
    ///
    /// `on_spoken` always runs, immediately when speech is off or there is nothing to read,
    /// and is dropped unrun only when no card is current.
    pub fn show_answer_then(&mut self, on_spoken: Option<Completion>) -> bool {
        let Some(current) = self.current.as_mut() else {
            return false;
        };
        current.answer_shown = true;
        let mechanism = self
            .store
            .get(&current.name)
            .and_then(|card| card.mechanism.clone());
        match mechanism {
            Some(mechanism) => self.announce(&mechanism, on_spoken),
            None => {
                if let Some(on_spoken) = on_spoken {
                    on_spoken();
                }
            }
        }
        true
    }

    // ─── answer / undo ─────────────────────────────────────────────────────

    /// Grade the current card.
    ///
    /// Updates the card's history, the session totals and the recent-errors list, then
    /// persists all three before returning. No-op returning `None` when no card is current.
    pub async fn answer(&mut self, difficulty: Difficulty) -> Option<AnswerOutcome> {
        let current = self.current.take()?;
        let name = current.name;

        self.undo = Some(UndoSnapshot {
            card_name: name.clone(),
            card_stats: self.store.stats(&name).cloned(),
            session: self.session.clone(),
            recent_errors: self.recent_errors.clone(),
        });

        let now = self.clock.now();
        let applied = self.scheduler.answer(
            &name,
            self.store.stats_entry(&name),
            &mut self.recent_errors,
            difficulty,
            now,
        );
        let credit = self.session.credit(difficulty, now.date_naive());

        match credit.rollover {
            DayRollover::SameDay => {}
            DayRollover::Continued => info!("study streak continued: {} days", self.session.streak),
            DayRollover::Restarted => info!("study streak started"),
        }
        if credit.leveled_up {
            info!("level up: now level {}", self.session.level);
        }
        debug!(
            "answered {name:?} {difficulty}: next review {}",
            applied.next_review.to_rfc3339()
        );

        self.persist_answer_state(&name).await;

        Some(AnswerOutcome {
            applied,
            credit,
            session: self.session.clone(),
        })
    }

    /// Revert the last answer.
    ///
    /// Restores the card's history, the session totals and the recent-errors list as they
    /// were, and makes the card current again with its answer shown. Returns `false` when
    /// there is nothing to undo.
    pub async fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo.take() else {
            return false;
        };
        let UndoSnapshot {
            card_name,
            card_stats,
            session,
            recent_errors,
        } = snapshot;

        self.store.replace_stats(&card_name, card_stats);
        self.session = session;
        self.recent_errors = recent_errors;
        self.persist_answer_state(&card_name).await;

        info!("undid last answer on {card_name:?}");
        let memo = self.load_memo(&card_name).await;
        self.current = Some(CurrentCard {
            name: card_name,
            answer_shown: true,
            memo,
        });
        true
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.undo.is_some()
    }

    async fn persist_answer_state(&self, name: &str) {
        let card_write = match self.store.stats(name) {
            Some(stats) => self.repo.set_card_stats(name, stats).await,
            None => self.repo.remove_card_stats(name).await,
        };
        best_effort_write("card stats", card_write);
        best_effort_write(
            "session stats",
            self.repo.set_session_stats(&self.session).await,
        );
        best_effort_write(
            "recent errors",
            self.repo.set_recent_errors(&self.recent_errors).await,
        );
    }

    // ─── mode / filter ─────────────────────────────────────────────────────

    /// Switch study mode. Clears any category or search filter and the undo slot.
    pub fn change_mode(&mut self, mode: StudyMode) {
        info!("study mode: {mode}");
        self.mode = mode;
        self.filter = None;
        self.undo = None;
    }

    /// Set (or clear, with `None`) a category or search filter overriding the mode.
    pub fn set_filter(&mut self, filter: Option<CardFilter>) {
        debug!("card filter: {filter:?}");
        self.filter = filter;
        self.undo = None;
    }

    #[must_use]
    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    #[must_use]
    pub fn filter(&self) -> Option<&CardFilter> {
        self.filter.as_ref()
    }

    /// Whether the last draw fell back to the full deck.
    #[must_use]
    pub fn fell_back(&self) -> bool {
        self.fell_back
    }

    // ─── card history ──────────────────────────────────────────────────────

    /// Flag a card for review: level 0, no scheduled time, picked up by weak mode.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownCard` if the deck has no card named `name`.
    pub async fn mark_for_review(&mut self, name: &str) -> Result<(), SessionError> {
        if !self.store.contains(name) {
            return Err(SessionError::UnknownCard(name.to_owned()));
        }
        self.scheduler.mark_for_review(self.store.stats_entry(name));
        self.undo = None;
        info!("marked {name:?} for review");

        if let Some(stats) = self.store.stats(name) {
            best_effort_write("card stats", self.repo.set_card_stats(name, stats).await);
        }
        Ok(())
    }

    pub async fn clear_recent_errors(&mut self) {
        self.recent_errors.clear();
        best_effort_write(
            "recent errors",
            self.repo.set_recent_errors(&self.recent_errors).await,
        );
    }

    /// Drop one card from the recent-errors list. Returns whether it was listed.
    pub async fn forget_recent_error(&mut self, name: &str) -> bool {
        if !self.recent_errors.remove(name) {
            return false;
        }
        best_effort_write(
            "recent errors",
            self.repo.set_recent_errors(&self.recent_errors).await,
        );
        true
    }

    #[must_use]
    pub fn recent_errors(&self) -> &RecentErrors {
        &self.recent_errors
    }

    #[must_use]
    pub fn card_stats(&self, name: &str) -> Option<&CardStats> {
        self.store.stats(name)
    }

    #[must_use]
    pub fn weak_categories(&self) -> Vec<CategoryAccuracy> {
        default_weak_categories(self.store.cards(), &self.store)
    }

    // ─── memos ─────────────────────────────────────────────────────────────

    /// Memo of the current card, `""` when none.
    #[must_use]
    pub fn memo(&self) -> &str {
        self.current.as_ref().map_or("", |c| c.memo.as_str())
    }

    /// Store the memo of the current card; blank text deletes it. No-op without a card.
    pub async fn save_memo(&mut self, text: &str) {
        let Some(current) = self.current.as_mut() else {
            return;
        };
        current.memo = if text.trim().is_empty() {
            String::new()
        } else {
            text.to_owned()
        };
        let name = current.name.clone();
        best_effort_write("memo", self.repo.set_memo(&name, text).await);
    }

    async fn load_memo(&self, name: &str) -> String {
        best_effort_read("memo", self.repo.get_memo(name).await)
    }

    // ─── settings ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn settings(&self) -> &StudySettings {
        &self.settings
    }

    /// Validate and apply new settings. A changed session length restarts the countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Settings` if the draft is out of range; the current
    /// settings are kept.
    pub async fn update_settings(
        &mut self,
        draft: StudySettingsDraft,
    ) -> Result<&StudySettings, SessionError> {
        let settings = draft.validate()?;
        if settings.session_minutes() != self.settings.session_minutes() {
            self.countdown = SessionCountdown::new(self.clock.now(), settings.session_length());
        }
        best_effort_write("settings", self.repo.set_settings(&settings).await);
        self.settings = settings;
        Ok(&self.settings)
    }

    // ─── speech ────────────────────────────────────────────────────────────

    /// Speak `text` when speech is enabled; otherwise run `on_end` right away.
    pub fn announce(&self, text: &str, on_end: Option<Completion>) {
        if self.settings.speech_enabled() {
            self.speech.speak(text, on_end);
        } else if let Some(on_end) = on_end {
            on_end();
        }
    }

    // ─── read side ─────────────────────────────────────────────────────────

    #[must_use]
    pub fn session_stats(&self) -> &SessionStats {
        &self.session
    }

    #[must_use]
    pub fn cards(&self) -> &[DrugCard] {
        self.store.cards()
    }

    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        self.store.categories()
    }

    #[must_use]
    pub fn deck_error(&self) -> Option<&str> {
        self.deck_error.as_deref()
    }

    #[must_use]
    pub fn countdown(&self) -> SessionCountdown {
        self.countdown
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Replace the time source, e.g. to move a fixed clock forward.
    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let current = self.current_card().cloned();
        let answer_shown = self.is_answer_shown();
        let answer_sections = match (&current, answer_shown) {
            (Some(card), true) => answer_sections(card, self.settings.micro_learning()),
            _ => Vec::new(),
        };
        let extra = current
            .as_ref()
            .filter(|_| answer_shown)
            .and_then(extra_section);

        SessionSnapshot {
            answer_shown,
            answer_sections,
            extra,
            memo: self.memo().to_owned(),
            stats: self.session.clone(),
            accuracy: self.session.accuracy(),
            progress_percent: self.session.progress_percent(self.settings.daily_goal()),
            mode: self.mode,
            filter: self.filter.clone(),
            fell_back: self.fell_back,
            total_cards: self.store.len(),
            can_undo: self.can_undo(),
            deck_error: self.deck_error.clone(),
            current,
        }
    }
}
