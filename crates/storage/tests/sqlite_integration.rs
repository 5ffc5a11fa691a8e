use chrono::Duration;
use pharma_core::model::{CardStats, Difficulty, DrugCard, Importance, RecentErrors, SessionStats};
use pharma_core::scheduler::Scheduler;
use pharma_core::time::fixed_now;
use storage::repository::{KeyValueStore, StudyRepository, keys};
use storage::sqlite::SqliteStore;

async fn connect(name: &str) -> SqliteStore {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let store = SqliteStore::connect(&url).await.expect("connect");
    store.migrate().await.expect("migrate");
    store
}

#[tokio::test]
async fn sqlite_roundtrip_persists_card_stats() {
    let store = connect("memdb_card_stats").await;
    let repo = StudyRepository::new(std::sync::Arc::new(store));

    let mut stats = CardStats::default();
    let mut errors = RecentErrors::new();
    let scheduler = Scheduler::new();
    scheduler.answer("Warfarin", &mut stats, &mut errors, Difficulty::Good, fixed_now());
    scheduler.answer("Warfarin", &mut stats, &mut errors, Difficulty::Again, fixed_now());
    repo.set_card_stats("Warfarin", &stats).await.unwrap();
    repo.set_recent_errors(&errors).await.unwrap();

    let fetched = repo.get_card_stats("Warfarin").await.unwrap().expect("stored");
    assert_eq!(fetched.attempts(), 2);
    assert_eq!(fetched.accuracy(), 50);
    assert_eq!(fetched.srs_level(), 0);
    assert_eq!(
        fetched.next_review(),
        Some(fixed_now() + Duration::minutes(1))
    );
    assert!(repo.get_recent_errors().await.unwrap().contains("Warfarin"));

    let all = repo.load_all_card_stats().await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn sqlite_upserts_and_removes() {
    let store = connect("memdb_upsert").await;
    store.set("memo_Heparin", "first").await.unwrap();
    store.set("memo_Heparin", "second").await.unwrap();
    assert_eq!(
        store.get("memo_Heparin").await.unwrap().as_deref(),
        Some("second")
    );

    store.remove("memo_Heparin").await.unwrap();
    assert_eq!(store.get("memo_Heparin").await.unwrap(), None);
    store.remove("memo_Heparin").await.unwrap();
}

#[tokio::test]
async fn sqlite_prefix_scan_treats_underscore_literally() {
    let store = connect("memdb_prefix").await;
    store.set("stats_Aspirin", "{}").await.unwrap();
    store.set("statsXAspirin", "{}").await.unwrap();
    store.set("STATS_Upper", "{}").await.unwrap();
    store.set(keys::SESSION_STATS, "{}").await.unwrap();

    let entries = store
        .entries_with_prefix(keys::CARD_STATS_PREFIX)
        .await
        .unwrap();
    let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["stats_Aspirin"]);
}

#[tokio::test]
async fn sqlite_repository_survives_reconnect() {
    let url = "sqlite:file:memdb_reconnect?mode=memory&cache=shared";
    let first = SqliteStore::connect(url).await.expect("connect");
    first.migrate().await.expect("migrate");
    let repo = StudyRepository::new(std::sync::Arc::new(first.clone()));

    let mut session = SessionStats::default();
    session.credit(Difficulty::Good, fixed_now().date_naive());
    repo.set_session_stats(&session).await.unwrap();
    repo.set_custom_cards(&[DrugCard::new("Custom", "Mine", Importance::Low)])
        .await
        .unwrap();

    // the shared in-memory database lives while `first` holds a connection
    let again = StudyRepository::sqlite(url).await.expect("reopen");
    assert_eq!(again.get_session_stats().await.unwrap(), session);
    assert_eq!(again.get_custom_cards().await.unwrap().len(), 1);
    drop(first);
}
