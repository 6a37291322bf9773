//! This module provides the local snapshot cache
//!
//! A [`CacheStore`] persists one [`Snapshot`] per subscription key into an injected [`ByteStore`], and answers freshness queries about them. \
//! It is a plain value, not a process-wide singleton: each [`Provider`](crate::provider::Provider) (and each test) gets its own instance over its own store.

use chrono::{DateTime, Duration, Utc};

use crate::config::CACHE_KEY_PREFIX;
use crate::error::CacheError;
use crate::snapshot::Snapshot;
use crate::traits::ByteStore;

/// Whether a snapshot is still recent enough to be served without a refresh: `now - fetched_at < ttl`
pub fn is_fresh(snapshot: &Snapshot, now: DateTime<Utc>, ttl: Duration) -> bool {
    now - snapshot.fetched_at < ttl
}

/// The keyed snapshot cache.
///
/// The [`Provider`](crate::provider::Provider) is the single writer; everything else only reads.
#[derive(Debug)]
pub struct CacheStore<S: ByteStore> {
    store: S,
}

impl<S: ByteStore> CacheStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn storage_key(subscription_key: &str) -> String {
        format!("{}{}", CACHE_KEY_PREFIX, subscription_key)
    }

    /// Read the cached snapshot of a subscription.
    ///
    /// Never fails: missing and corrupt entries both come back as `None` (a corrupt entry is logged, then treated as absent).
    pub fn read(&self, subscription_key: &str) -> Option<Snapshot> {
        let bytes = self.store.get(&Self::storage_key(subscription_key))?;
        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                log::warn!(
                    "Corrupt cached snapshot for {}: {}. Treating it as absent",
                    subscription_key,
                    err
                );
                None
            }
        }
    }

    /// Persist a snapshot, replacing any previous one for the same subscription.
    ///
    /// A snapshot older than the currently cached one is rejected with [`CacheError::StaleWrite`]: an abandoned refresh that completes late must not clobber the result of a more recent one. \
    /// The per-key write itself is a single [`ByteStore::set`], so a concurrent reader sees either the old snapshot or the new one, never a torn mix.
    pub fn write(&self, snapshot: &Snapshot) -> Result<(), CacheError> {
        if let Some(existing) = self.read(&snapshot.subscription_key) {
            if snapshot.fetched_at < existing.fetched_at {
                return Err(CacheError::StaleWrite {
                    key: snapshot.subscription_key.clone(),
                });
            }
        }

        let bytes = serde_json::to_vec(snapshot)?;
        self.store.set(&Self::storage_key(&snapshot.subscription_key), &bytes)
    }

    /// Remove every snapshot (any subscription) whose `fetched_at` predates `now - max_age`.
    /// Entries that can no longer be decoded are removed as well. Returns how many entries were dropped.
    ///
    /// Housekeeping, not a hot-path operation.
    pub fn purge_older_than(&self, now: DateTime<Utc>, max_age: Duration) -> Result<usize, CacheError> {
        let cutoff = now - max_age;
        let mut purged = 0;

        for key in self.store.list_keys_with_prefix(CACHE_KEY_PREFIX) {
            let outdated = match self.store.get(&key) {
                // Vanished in the meantime, nothing left to purge
                None => false,
                Some(bytes) => match serde_json::from_slice::<Snapshot>(&bytes) {
                    Ok(snapshot) => snapshot.fetched_at < cutoff,
                    Err(_) => true,
                },
            };
            if outdated {
                self.store.remove(&key)?;
                purged += 1;
            }
        }

        if purged > 0 {
            log::debug!("Purged {} outdated cache entr{}", purged, if purged == 1 { "y" } else { "ies" });
        }
        Ok(purged)
    }

    /// Drop the snapshot of one subscription
    pub fn clear(&self, subscription_key: &str) -> Result<(), CacheError> {
        self.store.remove(&Self::storage_key(subscription_key))
    }

    /// Drop every snapshot this cache ever wrote
    pub fn clear_all(&self) -> Result<(), CacheError> {
        for key in self.store.list_keys_with_prefix(CACHE_KEY_PREFIX) {
            self.store.remove(&key)?;
        }
        Ok(())
    }

    /// How many snapshots are currently persisted
    pub fn len(&self) -> usize {
        self.store.list_keys_with_prefix(CACHE_KEY_PREFIX).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every decodable snapshot currently persisted, in no particular order. A debugging aid
    pub fn read_all(&self) -> Vec<Snapshot> {
        self.store
            .list_keys_with_prefix(CACHE_KEY_PREFIX)
            .iter()
            .filter_map(|key| self.store.get(key))
            .filter_map(|bytes| serde_json::from_slice(&bytes).ok())
            .collect()
    }
}
