//! This module decides, on every request, where the schedule of a subscription comes from
//!
//! A [`Provider`] ties the other pieces together: it consults the [`CacheStore`] for a fresh snapshot, refreshes over the injected [`FeedFetcher`] when needed, diffs the result against the previous snapshot, and falls back to stale data when the network lets it down. \
//! Each call re-evaluates the decision tree from the top; no partially-completed state survives between calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex as AsyncMutex;

use crate::cache::{self, CacheStore};
use crate::config::DEFAULT_PURGE_MAX_AGE;
use crate::diff::{self, ChangeRecord};
use crate::error::{CacheError, SyncError};
use crate::event::Event;
use crate::feed;
use crate::snapshot::Snapshot;
use crate::traits::{ByteStore, ConnectivityProbe, FeedFetcher};

/// What a [`Provider::get_schedule`] call hands back on success.
///
/// Together with [`SyncError`] this gives callers the three-way outcome they need to render honestly:
/// * fresh success: `Ok` with `degraded == false`
/// * degraded success: `Ok` with `degraded == true` (offline or fetch failure, the events come from a stale snapshot and `changes` is empty)
/// * hard failure: `Err` (nothing to show at all)
#[derive(Clone, Debug, PartialEq)]
pub struct Schedule {
    /// The events of the subscription, sorted by start time
    pub events: Vec<Event>,
    /// What changed compared to the previous snapshot. Empty when the cache was served as-is
    pub changes: Vec<ChangeRecord>,
    /// Whether this result was built from stale data because a refresh could not be completed
    pub degraded: bool,
}

impl Schedule {
    fn cached(events: Vec<Event>) -> Self {
        Self {
            events,
            changes: Vec::new(),
            degraded: false,
        }
    }

    fn stale(events: Vec<Event>) -> Self {
        Self {
            events,
            changes: Vec::new(),
            degraded: true,
        }
    }
}

/// The coordinator between the feed fetcher, the parser, the cache and the change detector.
///
/// It owns its [`CacheStore`]: the provider is the only writer, which is what makes the per-key refresh serialization below sufficient.
pub struct Provider<F, C, S>
where
    F: FeedFetcher,
    C: ConnectivityProbe,
    S: ByteStore,
{
    fetcher: F,
    probe: C,
    cache: CacheStore<S>,

    /// One async mutex per subscription key. Concurrent `get_schedule` calls for the same key are *serialized*: the second caller waits, then re-evaluates from the top and finds the snapshot the first one just wrote, so a stale cache never triggers two fetches. Calls for different keys do not contend.
    refresh_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl<F, C, S> Provider<F, C, S>
where
    F: FeedFetcher,
    C: ConnectivityProbe,
    S: ByteStore,
{
    pub fn new(fetcher: F, probe: C, cache: CacheStore<S>) -> Self {
        Self {
            fetcher,
            probe,
            cache,
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying snapshot cache.
    ///
    /// Apart from tests and debug listings there are few reasons to reach for it directly; [`Provider::get_schedule`] is the intended entry point.
    pub fn cache(&self) -> &CacheStore<S> {
        &self.cache
    }

    /// Current events for a subscription, refreshing over the network when the cached snapshot is older than `ttl`.
    ///
    /// The full decision tree, in order:
    /// 1. a fresh cached snapshot is returned as-is, no network involved
    /// 2. offline with a (stale) snapshot: returned as a degraded result
    /// 3. offline with nothing cached: [`SyncError::NoDataOffline`]
    /// 4. online: fetch, parse, diff against the previous snapshot, write through the cache, return events + changes
    /// 5. fetch failed with a snapshot available: degraded result (stale-on-error)
    /// 6. fetch failed with nothing cached: [`SyncError::FetchFailedNoCache`]
    pub async fn get_schedule(
        &self,
        subscription_key: &str,
        ttl: Duration,
    ) -> Result<Schedule, SyncError> {
        let lock = self.refresh_lock(subscription_key);
        let _guard = lock.lock().await;

        let now = Utc::now();
        let previous = self.cache.read(subscription_key);

        if let Some(snapshot) = &previous {
            if cache::is_fresh(snapshot, now, ttl) {
                log::debug!("[{}] Serving the fresh cached snapshot", subscription_key);
                return Ok(Schedule::cached(snapshot.events.clone()));
            }
        }

        if !self.probe.is_online().await {
            return match previous {
                Some(snapshot) => {
                    log::info!("[{}] Offline, serving the stale snapshot", subscription_key);
                    Ok(Schedule::stale(snapshot.events))
                }
                None => Err(SyncError::NoDataOffline {
                    key: subscription_key.to_string(),
                }),
            };
        }

        log::debug!("[{}] Cache is stale or absent, fetching", subscription_key);
        match self.fetcher.fetch(subscription_key).await {
            Ok(bytes) => {
                let fetched_at = Utc::now();
                Ok(self.refresh(subscription_key, &bytes, previous, fetched_at))
            }
            Err(err) => match previous {
                Some(snapshot) => {
                    log::warn!(
                        "[{}] Fetch failed ({}), falling back to the stale snapshot",
                        subscription_key,
                        err
                    );
                    Ok(Schedule::stale(snapshot.events))
                }
                None => Err(SyncError::FetchFailedNoCache {
                    key: subscription_key.to_string(),
                    source: err,
                }),
            },
        }
    }

    /// Drop the cached snapshot of a subscription.
    ///
    /// To be called by the owner of the relevant external condition (the user switched groups, logged out, forced a refresh...). The next [`Provider::get_schedule`] for this key will fetch from scratch.
    pub fn invalidate(&self, subscription_key: &str) -> Result<(), CacheError> {
        log::debug!("[{}] Invalidating the cached snapshot", subscription_key);
        self.cache.clear(subscription_key)
    }

    /// The success path after a fetch: parse (unless the bytes are unchanged), diff, write through, housekeep
    fn refresh(
        &self,
        subscription_key: &str,
        bytes: &[u8],
        previous: Option<Snapshot>,
        fetched_at: DateTime<Utc>,
    ) -> Schedule {
        let digest = Snapshot::digest_of(bytes);

        if let Some(snapshot) = &previous {
            if snapshot.raw_digest.as_deref() == Some(digest.as_str()) {
                log::debug!("[{}] Feed bytes unchanged, skipping the re-parse", subscription_key);
                let refreshed =
                    Snapshot::new(subscription_key, snapshot.events.clone(), fetched_at)
                        .with_digest(digest);
                self.persist(&refreshed);
                self.housekeeping(fetched_at);
                return Schedule::cached(refreshed.events);
            }
        }

        let text = String::from_utf8_lossy(bytes);
        let (events, warnings) = feed::parse(&text);
        for warning in &warnings {
            log::warn!("[{}] {}", subscription_key, warning);
        }

        let previous_events = previous
            .as_ref()
            .map(|snapshot| snapshot.events.as_slice())
            .unwrap_or(&[]);
        let changes = diff::detect_changes(previous_events, &events);

        let snapshot = Snapshot::new(subscription_key, events, fetched_at).with_digest(digest);
        self.persist(&snapshot);
        self.housekeeping(fetched_at);

        Schedule {
            events: snapshot.events,
            changes,
            degraded: false,
        }
    }

    fn persist(&self, snapshot: &Snapshot) {
        // A failed cache write does not fail the call: the fresh data is still returned this once
        if let Err(err) = self.cache.write(snapshot) {
            log::warn!(
                "[{}] Unable to persist the refreshed snapshot: {}",
                snapshot.subscription_key,
                err
            );
        }
    }

    fn housekeeping(&self, now: DateTime<Utc>) {
        if let Err(err) = self.cache.purge_older_than(now, *DEFAULT_PURGE_MAX_AGE) {
            log::warn!("Cache housekeeping failed: {}", err);
        }
    }

    fn refresh_lock(&self, subscription_key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.refresh_locks.lock().unwrap();
        locks
            .entry(subscription_key.to_string())
            .or_insert_with(Default::default)
            .clone()
    }
}
