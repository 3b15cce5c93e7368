// tests/cooldown_store_tests.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use parking_lot::Mutex;

use maowcmd_common::models::GuildCooldownRecord;
use maowcmd_common::traits::repository_traits::CooldownRepository;
use maowcmd_core::Error;
use maowcmd_core::repositories::InMemoryCooldownRepository;
use maowcmd_core::services::CooldownStore;
use maowcmd_core::tasks::spawn_cooldown_prune_task;
use maowcmd_core::test_utils::ManualClock;

const START: i64 = 1_700_000_000_000;

mock! {
    pub CooldownRepo {}

    #[async_trait]
    impl CooldownRepository for CooldownRepo {
        async fn load_guild_record(&self, guild_id: &str) -> Result<Option<GuildCooldownRecord>, Error>;
        async fn save_guild_record(&self, guild_id: &str, record: &GuildCooldownRecord) -> Result<(), Error>;
        async fn list_guild_ids(&self) -> Result<Vec<String>, Error>;
    }
}

fn setup() -> (Arc<InMemoryCooldownRepository>, Arc<ManualClock>, Arc<CooldownStore>) {
    let repo = Arc::new(InMemoryCooldownRepository::new());
    let clock = Arc::new(ManualClock::new(START));
    let store = Arc::new(CooldownStore::new(repo.clone(), clock.clone()));
    (repo, clock, store)
}

/// Lets spawned expiry tasks finish their repository round trip.
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn timer_removes_entry_at_expiry() -> Result<(), Error> {
    let (repo, _clock, store) = setup();

    store.activate("g", "u", "ping", Some(5_000), Some(60_000)).await;
    let record = store.fetch("g").await;
    assert_eq!(record.cooldowns[0].expires, START + 5_000);
    assert_eq!(record.global_cooldowns[0].expires, START + 60_000);
    assert_eq!(store.pending_timers(), 2);

    tokio::time::sleep(Duration::from_millis(5_001)).await;
    settle().await;
    let record = repo.snapshot("g").expect("record kept");
    assert!(record.cooldowns.is_empty());
    assert_eq!(record.global_cooldowns.len(), 1);
    assert_eq!(store.pending_timers(), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    settle().await;
    assert!(repo.snapshot("g").expect("record kept").is_empty());
    assert_eq!(store.pending_timers(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn reactivation_replaces_the_pending_timer() -> Result<(), Error> {
    let (repo, clock, store) = setup();

    store.activate("g", "u", "ping", Some(5_000), None).await;
    tokio::time::advance(Duration::from_millis(1_000)).await;
    clock.advance(1_000);
    store.activate("g", "u", "ping", Some(5_000), None).await;
    assert_eq!(store.pending_timers(), 1);

    // The first timer would have fired here.
    tokio::time::sleep(Duration::from_millis(4_500)).await;
    settle().await;
    let record = repo.snapshot("g").expect("record kept");
    assert_eq!(record.cooldowns.len(), 1);
    assert_eq!(record.cooldowns[0].expires, START + 6_000);

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    settle().await;
    assert!(repo.snapshot("g").expect("record kept").cooldowns.is_empty());
    assert_eq!(store.pending_timers(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn reset_cancels_timer_and_entry() -> Result<(), Error> {
    let (repo, _clock, store) = setup();

    store.activate("g", "u", "ping", Some(60_000), Some(60_000)).await;
    assert!(store.reset_user("g", "u", "ping").await);
    assert!(!store.reset_user("g", "u", "ping").await);
    assert_eq!(store.pending_timers(), 1);

    assert!(store.reset_guild("g", "ping").await);
    assert_eq!(store.pending_timers(), 0);
    assert!(repo.snapshot("g").expect("record kept").is_empty());
    Ok(())
}

#[tokio::test]
async fn fetch_prunes_lazily_and_persists() -> Result<(), Error> {
    let (repo, clock, store) = setup();
    let mut seeded = GuildCooldownRecord::new();
    seeded.set_user_cooldown("u", "ping", START - 1);
    seeded.set_user_cooldown("v", "ping", START + 1_000);
    repo.save_guild_record("g", &seeded).await?;

    let record = store.fetch("g").await;
    assert_eq!(record.cooldowns.len(), 1);
    assert_eq!(repo.snapshot("g"), Some(record.clone()));

    clock.advance(1_000);
    assert!(store.fetch("g").await.is_empty());
    assert!(store.fetch("unknown").await.is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn initialize_prunes_and_reschedules() -> Result<(), Error> {
    let (repo, _clock, store) = setup();
    let mut a = GuildCooldownRecord::new();
    a.set_user_cooldown("u", "ping", START - 10);
    a.set_guild_cooldown("roll", START + 2_000);
    let mut b = GuildCooldownRecord::new();
    b.set_guild_cooldown("ping", START);
    repo.save_guild_record("a", &a).await?;
    repo.save_guild_record("b", &b).await?;

    assert_eq!(store.initialize().await?, 2);
    assert_eq!(store.pending_timers(), 1);
    assert!(repo.snapshot("b").expect("record kept").is_empty());

    // A second sweep finds nothing new.
    assert_eq!(store.prune_all().await?, 0);

    tokio::time::sleep(Duration::from_millis(2_001)).await;
    settle().await;
    assert!(repo.snapshot("a").expect("record kept").is_empty());
    Ok(())
}

#[tokio::test]
async fn prune_all_is_idempotent() -> Result<(), Error> {
    let (repo, clock, store) = setup();
    let mut record = GuildCooldownRecord::new();
    record.set_user_cooldown("u", "ping", START + 100);
    record.set_user_cooldown("v", "ping", START + 10_000);
    repo.save_guild_record("g", &record).await?;

    clock.advance(100);
    assert_eq!(store.prune_all().await?, 1);
    let once = repo.snapshot("g");
    assert_eq!(store.prune_all().await?, 0);
    assert_eq!(repo.snapshot("g"), once);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn periodic_prune_task_sweeps_records() -> Result<(), Error> {
    let (repo, clock, store) = setup();
    let mut record = GuildCooldownRecord::new();
    record.set_user_cooldown("u", "ping", START + 500);
    repo.save_guild_record("g", &record).await?;
    clock.advance(1_000);

    let task = spawn_cooldown_prune_task(store, Duration::from_secs(60));
    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(repo.snapshot("g"), Some(record));

    tokio::time::sleep(Duration::from_secs(2)).await;
    settle().await;
    assert!(repo.snapshot("g").expect("record kept").is_empty());
    task.abort();
    Ok(())
}

#[tokio::test]
async fn repository_failures_are_absorbed() -> Result<(), Error> {
    let mut repo = MockCooldownRepo::new();
    repo.expect_load_guild_record()
        .returning(|_| Err(Error::Store("connection reset".into())));
    repo.expect_save_guild_record().never();
    repo.expect_list_guild_ids()
        .returning(|| Err(Error::Store("connection reset".into())));

    let store = Arc::new(CooldownStore::new(Arc::new(repo), Arc::new(ManualClock::new(START))));

    assert!(store.fetch("g").await.is_empty());
    store.activate("g", "u", "ping", Some(1_000), None).await;
    assert_eq!(store.pending_timers(), 0);
    assert!(!store.reset_user("g", "u", "ping").await);
    assert!(!store.reset_guild("g", "ping").await);

    let err = store.prune_all().await.unwrap_err();
    assert!(err.is_store_error());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unreadable_record_is_never_overwritten() -> Result<(), Error> {
    let mut seeded = GuildCooldownRecord::new();
    seeded.set_user_cooldown("u1", "ping", START + 60_000);
    seeded.set_guild_cooldown("ping", START + 60_000);

    let loads = Arc::new(AtomicUsize::new(0));
    let saved = Arc::new(Mutex::new(Vec::new()));

    let mut repo = MockCooldownRepo::new();
    let stored = seeded.clone();
    let calls = loads.clone();
    repo.expect_load_guild_record().returning(move |_| {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(Error::Store("connection reset".into()))
        } else {
            Ok(Some(stored.clone()))
        }
    });
    let sink = saved.clone();
    repo.expect_save_guild_record().times(1).returning(move |_, record| {
        sink.lock().push(record.clone());
        Ok(())
    });

    let store = Arc::new(CooldownStore::new(Arc::new(repo), Arc::new(ManualClock::new(START))));

    // The failed read leaves the stored record alone.
    store.activate("g", "u2", "roll", Some(60_000), None).await;
    assert!(saved.lock().is_empty());
    assert_eq!(store.pending_timers(), 0);

    store.activate("g", "u2", "roll", Some(60_000), None).await;
    let written = saved.lock().pop().expect("record saved");
    assert!(written.active_user_cooldown("u1", "ping", START).is_some());
    assert!(written.active_guild_cooldown("ping", START).is_some());
    assert_eq!(
        written.active_user_cooldown("u2", "roll", START).map(|cd| cd.expires),
        Some(START + 60_000)
    );
    assert_eq!(loads.load(Ordering::SeqCst), 2);
    store.shutdown();
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn huge_durations_saturate() -> Result<(), Error> {
    let (repo, _clock, store) = setup();

    store.activate("g", "u", "ping", Some(u64::MAX), Some(u64::MAX)).await;
    let record = repo.snapshot("g").expect("record kept");
    assert_eq!(record.cooldowns[0].expires, i64::MAX);
    assert_eq!(record.global_cooldowns[0].expires, i64::MAX);
    assert!(store.fetch("g").await.active_user_cooldown("u", "ping", START).is_some());
    store.shutdown();
    Ok(())
}
