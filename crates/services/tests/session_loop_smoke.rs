use chrono::Duration;
use pharma_core::filter::{CardFilter, StudyMode, filter_candidates};
use pharma_core::model::{Difficulty, DrugCard, Importance};
use pharma_core::time::{fixed_clock, fixed_now};
use services::{Clock, SessionController, StudyLoop};
use storage::repository::StudyRepository;

fn deck(n: usize) -> Vec<DrugCard> {
    (0..n)
        .map(|i| {
            DrugCard::new(format!("Drug {i}"), "Generic", Importance::Medium).with_frequency(10.0)
        })
        .collect()
}

async fn open(repo: StudyRepository, cards: Vec<DrugCard>, clock: Clock) -> SessionController {
    SessionController::builder(repo)
        .with_clock(clock)
        .with_seed(2024)
        .with_deck(cards)
        .open()
        .await
}

#[tokio::test]
async fn empty_deck_shows_nothing() {
    let mut ctl = open(StudyRepository::in_memory(), Vec::new(), fixed_clock()).await;
    assert!(ctl.next_card().await.is_none());
    assert!(ctl.answer(Difficulty::Good).await.is_none());

    let snapshot = ctl.snapshot();
    assert!(snapshot.current.is_none());
    assert_eq!(snapshot.total_cards, 0);
    assert!(snapshot.deck_error.is_none());
}

#[tokio::test]
async fn heavy_card_dominates_draws() {
    let mut cards = deck(9);
    cards.push(DrugCard::new("Heavy", "Generic", Importance::Medium).with_frequency(100.0));
    let mut ctl = open(StudyRepository::in_memory(), cards, fixed_clock()).await;

    let mut heavy = 0;
    for _ in 0..1000 {
        if ctl.skip().await.is_some_and(|card| card.name == "Heavy") {
            heavy += 1;
        }
    }
    assert!(heavy > 400, "heavy drawn {heavy} times");
}

#[tokio::test]
async fn again_then_easy_schedule_from_answer_time() {
    let mut clock = fixed_clock();
    let mut ctl = open(StudyRepository::in_memory(), deck(3), clock).await;
    ctl.set_filter(Some(CardFilter::Search("Drug 1".into())));

    ctl.next_card().await.unwrap();
    ctl.answer(Difficulty::Again).await.unwrap();
    let t = fixed_now();
    assert_eq!(
        ctl.card_stats("Drug 1").unwrap().next_review(),
        Some(t + Duration::milliseconds(60_000))
    );

    clock.advance(Duration::minutes(3));
    ctl.set_clock(clock);
    ctl.next_card().await.unwrap();
    ctl.answer(Difficulty::Easy).await.unwrap();
    let t2 = t + Duration::minutes(3);
    assert_eq!(
        ctl.card_stats("Drug 1").unwrap().next_review(),
        Some(t2 + Duration::milliseconds(345_600_000))
    );
}

#[tokio::test]
async fn repeated_misses_lead_recent_errors_and_survive_a_hit() {
    let mut ctl = open(StudyRepository::in_memory(), deck(4), fixed_clock()).await;

    ctl.set_filter(Some(CardFilter::Search("Drug 0".into())));
    ctl.next_card().await;
    ctl.answer(Difficulty::Again).await;

    ctl.set_filter(Some(CardFilter::Search("Drug 2".into())));
    for _ in 0..3 {
        ctl.next_card().await.unwrap();
        ctl.answer(Difficulty::Again).await.unwrap();
    }
    assert_eq!(ctl.card_stats("Drug 2").unwrap().consecutive_correct(), 0);
    assert_eq!(ctl.recent_errors().position("Drug 2"), Some(0));
    assert_eq!(ctl.recent_errors().len(), 2);

    ctl.next_card().await.unwrap();
    ctl.answer(Difficulty::Good).await.unwrap();
    assert_eq!(ctl.card_stats("Drug 2").unwrap().consecutive_correct(), 1);
    assert!(ctl.recent_errors().contains("Drug 2"));

    ctl.set_filter(None);
    ctl.change_mode(StudyMode::Quick);
    for _ in 0..20 {
        let name = ctl.next_card().await.unwrap().name.clone();
        assert!(name == "Drug 0" || name == "Drug 2");
    }
}

#[tokio::test]
async fn weak_mode_on_fresh_deck_is_the_whole_deck() {
    let cards = deck(5);
    let mut ctl = open(StudyRepository::in_memory(), cards.clone(), fixed_clock()).await;

    let pool = filter_candidates(
        &cards,
        StudyMode::Weak,
        &std::collections::HashMap::new(),
        ctl.recent_errors(),
        fixed_now(),
    );
    assert_eq!(pool.len(), 5);
    assert!(!pool.fell_back);

    ctl.change_mode(StudyMode::Weak);
    assert!(ctl.next_card().await.is_some());
    assert!(!ctl.fell_back());
}

#[tokio::test]
async fn due_mode_picks_up_cards_once_their_time_passes() {
    let mut clock = fixed_clock();
    let mut ctl = open(StudyRepository::in_memory(), deck(3), clock).await;

    ctl.set_filter(Some(CardFilter::Search("Drug 1".into())));
    ctl.next_card().await;
    ctl.answer(Difficulty::Hard).await;
    ctl.change_mode(StudyMode::Due);

    ctl.next_card().await;
    assert!(ctl.fell_back(), "nothing is due yet");

    clock.advance(Duration::minutes(7));
    ctl.set_clock(clock);
    assert_eq!(ctl.next_card().await.unwrap().name, "Drug 1");
    assert!(!ctl.fell_back());
}

#[tokio::test]
async fn streak_and_daily_counters_follow_the_calendar() {
    let repo = StudyRepository::in_memory();
    let mut clock = fixed_clock();

    let mut ctl = open(repo.clone(), deck(2), clock).await;
    ctl.next_card().await;
    ctl.answer(Difficulty::Good).await;
    assert_eq!(ctl.session_stats().streak, 1);

    clock.advance(Duration::days(1));
    let mut ctl = open(repo.clone(), deck(2), clock).await;
    assert_eq!(ctl.session_stats().today_studied, 0);
    ctl.next_card().await;
    ctl.answer(Difficulty::Good).await;
    assert_eq!(ctl.session_stats().streak, 2);
    assert_eq!(ctl.session_stats().today_studied, 1);

    clock.advance(Duration::days(3));
    let mut ctl = open(repo, deck(2), clock).await;
    assert_eq!(ctl.session_stats().streak, 0);
    ctl.next_card().await;
    ctl.answer(Difficulty::Good).await;
    assert_eq!(ctl.session_stats().streak, 1);
}

#[tokio::test]
async fn xp_levels_up_across_answers() {
    let mut ctl = open(StudyRepository::in_memory(), deck(2), fixed_clock()).await;
    let mut leveled = false;
    for _ in 0..4 {
        ctl.next_card().await;
        let outcome = ctl.answer(Difficulty::Easy).await.unwrap();
        leveled |= outcome.credit.leveled_up;
    }
    // 4 * 15 = 60 xp: level 1 -> 2 at 50
    assert!(leveled);
    assert_eq!(ctl.session_stats().level, 2);
    assert_eq!(ctl.session_stats().xp, 10);
}

#[tokio::test]
async fn sqlite_backed_loop_persists_between_sessions() {
    let url = "sqlite:file:memdb_services_loop?mode=memory&cache=shared";
    let repo = StudyRepository::sqlite(url).await.expect("sqlite");

    let ctl = open(repo.clone(), deck(3), fixed_clock()).await;
    let mut study = StudyLoop::new(ctl).with_pacing(std::time::Duration::ZERO);
    study.start().await.unwrap();
    for difficulty in [Difficulty::Good, Difficulty::Again, Difficulty::Easy] {
        study.answer_and_advance(difficulty).await.unwrap();
    }
    study.stop();

    let reopened = open(repo.clone(), deck(3), fixed_clock()).await;
    assert_eq!(reopened.session_stats().total_answers, 3);
    assert_eq!(reopened.session_stats().correct_answers, 2);
    let attempts: u32 = repo
        .load_all_card_stats()
        .await
        .unwrap()
        .values()
        .map(|stats| stats.attempts())
        .sum();
    assert_eq!(attempts, 3);
}
