//! The collaborator interfaces this crate consumes
//!
//! The [`Provider`](crate::provider::Provider) is generic over these traits, so that tests (and unusual deployments) can inject their own network and storage layers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{CacheError, FetchError};

/// Retrieves the raw bytes of a feed.
///
/// Implementations are expected to already carry whatever authentication the feed endpoint needs. \
/// Timeouts are their responsibility too: a fetch must eventually resolve, surfacing failures as [`FetchError`] rather than hanging forever.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, subscription_key: &str) -> Result<Vec<u8>, FetchError>;
}

/// Answers "do we currently have network access?".
///
/// A probe that cannot tell (e.g. its own query failed) should answer `true` and let the fetch itself fail; the provider falls back to the cache either way.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// A persistent byte-string store (key/value), the storage backend of the [`CacheStore`](crate::cache::CacheStore).
///
/// Individual operations must be atomic per key: a `get` concurrent with a `set` of the same key observes either the old bytes or the new ones, never a mix. \
/// Ready-made implementations live in [`store`](crate::store).
pub trait ByteStore: Send + Sync {
    /// Returns the stored bytes, or `None` when the key is absent
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    /// Stores the bytes, replacing any previous value for this key
    fn set(&self, key: &str, bytes: &[u8]) -> Result<(), CacheError>;
    /// Removes the key. Removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<(), CacheError>;
    /// Returns every stored key that starts with `prefix`
    fn list_keys_with_prefix(&self, prefix: &str) -> Vec<String>;
}

// An `Arc` to a collaborator is a collaborator too, so a caller (or a test double)
// can keep a handle on the instance it hands to a `Provider`

#[async_trait]
impl<T: FeedFetcher + ?Sized> FeedFetcher for Arc<T> {
    async fn fetch(&self, subscription_key: &str) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(subscription_key).await
    }
}

#[async_trait]
impl<T: ConnectivityProbe + ?Sized> ConnectivityProbe for Arc<T> {
    async fn is_online(&self) -> bool {
        (**self).is_online().await
    }
}

impl<T: ByteStore + ?Sized> ByteStore for Arc<T> {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, bytes: &[u8]) -> Result<(), CacheError> {
        (**self).set(key, bytes)
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        (**self).remove(key)
    }

    fn list_keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        (**self).list_keys_with_prefix(prefix)
    }
}
