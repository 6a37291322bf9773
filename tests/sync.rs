//! End-to-end scenarios for the provider: cache policy, offline behaviour, fallback, change reports


use std::sync::Arc;

use chrono::{Duration, Utc};

use timetable_sync::cache::CacheStore;
use timetable_sync::error::{FetchError, SyncError};
use timetable_sync::store::MemoryStore;
use timetable_sync::{feed, ChangeKind, Provider, Snapshot};

use scenarii::{feed as feed_of, vevent, FixedFetcher, FixedProbe, ReadOnlyStore, SequenceFetcher};

const KEY: &str = "group-42";

fn ttl() -> Duration {
    Duration::hours(1)
}

fn feed_v1() -> String {
    feed_of(&[
        vevent("uid-1", "Math", "Room A", "20250106T100000", "20250106T110000"),
        vevent("uid-2", "Physics", "Room C", "20250106T140000", "20250106T160000"),
    ])
}

/// Same events as [`feed_v1`], except Math moved to the afternoon
fn feed_v2() -> String {
    feed_of(&[
        vevent("uid-1", "Math", "Room A", "20250106T150000", "20250106T160000"),
        vevent("uid-2", "Physics", "Room C", "20250106T140000", "20250106T160000"),
    ])
}

/// A snapshot holding the parse of `payload`, fetched `age` ago
fn snapshot_of(payload: &str, age: Duration) -> Snapshot {
    let (events, warnings) = feed::parse(payload);
    assert!(warnings.is_empty(), "fixture should parse cleanly: {:?}", warnings);
    Snapshot::new(KEY, events, Utc::now() - age).with_digest(Snapshot::digest_of(payload.as_bytes()))
}

#[tokio::test]
async fn fresh_cache_is_served_without_fetching() {
    let _ = env_logger::builder().is_test(true).try_init();

    let fetcher = Arc::new(FixedFetcher::ok(&feed_v2()));
    let provider = Provider::new(fetcher.clone(), FixedProbe(true), CacheStore::new(MemoryStore::new()));
    let seeded = snapshot_of(&feed_v1(), Duration::minutes(5));
    provider.cache().write(&seeded).unwrap();

    let schedule = provider.get_schedule(KEY, ttl()).await.unwrap();

    assert_eq!(schedule.events, seeded.events);
    assert!(schedule.changes.is_empty());
    assert!(!schedule.degraded);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn stale_cache_triggers_a_refresh_and_reports_changes() {
    let _ = env_logger::builder().is_test(true).try_init();

    let provider = Provider::new(
        FixedFetcher::ok(&feed_v2()),
        FixedProbe(true),
        CacheStore::new(MemoryStore::new()),
    );
    provider.cache().write(&snapshot_of(&feed_v1(), Duration::hours(2))).unwrap();

    let schedule = provider.get_schedule(KEY, ttl()).await.unwrap();

    assert!(!schedule.degraded);
    assert_eq!(schedule.changes.len(), 1);
    assert_eq!(schedule.changes[0].kind, ChangeKind::Moved);
    let moved = schedule.changes[0].current.as_ref().unwrap();
    assert_eq!(moved.title, "Math");

    // The cache now holds the refreshed snapshot
    let cached = provider.cache().read(KEY).unwrap();
    assert_eq!(cached.events, schedule.events);
    assert!(cached.raw_digest.is_some());
    assert!(Utc::now() - cached.fetched_at < Duration::minutes(1));
}

#[tokio::test]
async fn first_fetch_reports_every_event_as_added() {
    let _ = env_logger::builder().is_test(true).try_init();

    let provider = Provider::new(
        FixedFetcher::ok(&feed_v1()),
        FixedProbe(true),
        CacheStore::new(MemoryStore::new()),
    );

    let schedule = provider.get_schedule(KEY, ttl()).await.unwrap();

    assert_eq!(schedule.events.len(), 2);
    assert_eq!(schedule.changes.len(), 2);
    assert!(schedule.changes.iter().all(|c| c.kind == ChangeKind::Added));
}

#[tokio::test]
async fn fetch_failure_falls_back_to_the_stale_snapshot() {
    let _ = env_logger::builder().is_test(true).try_init();

    let provider = Provider::new(
        FixedFetcher::failing(FetchError::Timeout),
        FixedProbe(true),
        CacheStore::new(MemoryStore::new()),
    );
    let seeded = snapshot_of(&feed_v1(), Duration::hours(2));
    provider.cache().write(&seeded).unwrap();

    let schedule = provider.get_schedule(KEY, ttl()).await.unwrap();

    assert!(schedule.degraded);
    assert_eq!(schedule.events, seeded.events);
    assert!(schedule.changes.is_empty());
}

#[tokio::test]
async fn fetch_failure_without_cache_is_an_error() {
    let _ = env_logger::builder().is_test(true).try_init();

    let provider = Provider::new(
        FixedFetcher::failing(FetchError::Status(503)),
        FixedProbe(true),
        CacheStore::new(MemoryStore::new()),
    );

    match provider.get_schedule(KEY, ttl()).await {
        Err(SyncError::FetchFailedNoCache { key, source }) => {
            assert_eq!(key, KEY);
            assert_eq!(source, FetchError::Status(503));
        }
        other => panic!("expected FetchFailedNoCache, got {:?}", other),
    }
}

#[tokio::test]
async fn offline_serves_the_stale_snapshot() {
    let _ = env_logger::builder().is_test(true).try_init();

    let fetcher = Arc::new(FixedFetcher::ok(&feed_v2()));
    let provider = Provider::new(fetcher.clone(), FixedProbe(false), CacheStore::new(MemoryStore::new()));
    let seeded = snapshot_of(&feed_v1(), Duration::hours(48));
    provider.cache().write(&seeded).unwrap();

    let schedule = provider.get_schedule(KEY, ttl()).await.unwrap();

    assert!(schedule.degraded);
    assert_eq!(schedule.events, seeded.events);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn offline_without_cache_fails() {
    let _ = env_logger::builder().is_test(true).try_init();

    let provider = Provider::new(
        FixedFetcher::ok(&feed_v1()),
        FixedProbe(false),
        CacheStore::new(MemoryStore::new()),
    );

    match provider.get_schedule(KEY, ttl()).await {
        Err(SyncError::NoDataOffline { key }) => assert_eq!(key, KEY),
        other => panic!("expected NoDataOffline, got {:?}", other),
    }
}

#[tokio::test]
async fn concurrent_requests_for_the_same_key_fetch_only_once() {
    let _ = env_logger::builder().is_test(true).try_init();

    let fetcher = Arc::new(FixedFetcher::ok(&feed_v1()).with_delay_ms(50));
    let provider = Provider::new(fetcher.clone(), FixedProbe(true), CacheStore::new(MemoryStore::new()));

    let (first, second) = tokio::join!(
        provider.get_schedule(KEY, ttl()),
        provider.get_schedule(KEY, ttl()),
    );

    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.events, second.events);
    // The second call was serialized behind the first and found a fresh snapshot
    // instead of triggering a fetch of its own
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn unchanged_bytes_skip_the_reparse() {
    let _ = env_logger::builder().is_test(true).try_init();

    let payload = feed_v1();
    let provider = Provider::new(
        FixedFetcher::ok(&payload),
        FixedProbe(true),
        CacheStore::new(MemoryStore::new()),
    );

    // A stale snapshot whose events deliberately do NOT match what the payload parses to,
    // but whose digest does: if the provider re-parsed, the events would change
    let (mut events, _) = feed::parse(&payload);
    events.truncate(1);
    let seeded = Snapshot::new(KEY, events.clone(), Utc::now() - Duration::hours(2))
        .with_digest(Snapshot::digest_of(payload.as_bytes()));
    provider.cache().write(&seeded).unwrap();

    let schedule = provider.get_schedule(KEY, ttl()).await.unwrap();

    assert_eq!(schedule.events, events);
    assert!(schedule.changes.is_empty());
    assert!(!schedule.degraded);
    // The snapshot was still re-stamped as freshly fetched
    let cached = provider.cache().read(KEY).unwrap();
    assert!(Utc::now() - cached.fetched_at < Duration::minutes(1));
}

#[tokio::test]
async fn a_successful_refresh_purges_ancient_snapshots() {
    let _ = env_logger::builder().is_test(true).try_init();

    let provider = Provider::new(
        FixedFetcher::ok(&feed_v1()),
        FixedProbe(true),
        CacheStore::new(MemoryStore::new()),
    );
    let ancient = Snapshot::new("forgotten-group", Vec::new(), Utc::now() - Duration::days(8));
    provider.cache().write(&ancient).unwrap();

    provider.get_schedule(KEY, ttl()).await.unwrap();

    assert!(provider.cache().read("forgotten-group").is_none());
    assert!(provider.cache().read(KEY).is_some());
}

#[tokio::test]
async fn invalidate_forces_the_next_call_to_fetch() {
    let _ = env_logger::builder().is_test(true).try_init();

    let fetcher = Arc::new(FixedFetcher::ok(&feed_v1()));
    let provider = Provider::new(fetcher.clone(), FixedProbe(true), CacheStore::new(MemoryStore::new()));
    provider.cache().write(&snapshot_of(&feed_v1(), Duration::minutes(1))).unwrap();

    provider.invalidate(KEY).unwrap();
    let schedule = provider.get_schedule(KEY, ttl()).await.unwrap();

    // The fresh snapshot is gone, so this had to come from the network
    assert_eq!(fetcher.calls(), 1);
    assert!(!schedule.changes.is_empty());
    assert!(!schedule.degraded);
}

#[tokio::test]
async fn cache_write_failure_still_returns_the_fresh_data() {
    let _ = env_logger::builder().is_test(true).try_init();

    let provider = Provider::new(
        FixedFetcher::ok(&feed_v1()),
        FixedProbe(true),
        CacheStore::new(ReadOnlyStore::default()),
    );

    let schedule = provider.get_schedule(KEY, ttl()).await.unwrap();

    assert_eq!(schedule.events.len(), 2);
    assert!(!schedule.degraded);
    // Nothing could be persisted though
    assert!(provider.cache().read(KEY).is_none());
}

#[tokio::test]
async fn successive_refreshes_diff_against_the_previous_snapshot() {
    let _ = env_logger::builder().is_test(true).try_init();

    let fetcher = SequenceFetcher::of(vec![&feed_v1(), &feed_v2()]);
    let provider = Provider::new(fetcher, FixedProbe(true), CacheStore::new(MemoryStore::new()));

    // TTL of zero: every call refreshes
    let first = provider.get_schedule(KEY, Duration::zero()).await.unwrap();
    assert_eq!(first.changes.len(), 2);
    assert!(first.changes.iter().all(|c| c.kind == ChangeKind::Added));

    let second = provider.get_schedule(KEY, Duration::zero()).await.unwrap();
    assert_eq!(second.changes.len(), 1);
    assert_eq!(second.changes[0].kind, ChangeKind::Moved);
}
