//! The error types of this crate
//!
//! Most failures are recovered internally (a corrupt cache entry is treated as absent, a failed refresh falls back to the stale snapshot...). \
//! [`SyncError`] is the only type that reaches callers of [`Provider::get_schedule`](crate::provider::Provider::get_schedule).

use thiserror::Error;

/// An error returned by the injected [`FeedFetcher`](crate::traits::FeedFetcher).
///
/// Timeouts are the fetcher's responsibility, they must surface here rather than hang.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum FetchError {
    #[error("the request timed out")]
    Timeout,
    #[error("the server answered with HTTP status {0}")]
    Status(u16),
    #[error("the network is unreachable: {0}")]
    Unreachable(String),
}

/// An error raised by the [`CacheStore`](crate::cache::CacheStore) or its backing [`ByteStore`](crate::traits::ByteStore)
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store rejected the operation (disk full, permission denied...)
    #[error("the persistent store failed: {0}")]
    Store(String),
    /// The snapshot could not be encoded to its persisted representation
    #[error("unable to serialize the snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    /// A newer snapshot is already cached for this subscription.
    /// This happens when an abandoned refresh completes after a more recent one already wrote its result.
    #[error("a newer snapshot is already cached for {key}")]
    StaleWrite { key: String },
}

/// The only error type surfaced to the callers of this crate.
///
/// Note that a refresh failure alone is not enough to get here: as long as a previous snapshot exists, [`Provider::get_schedule`](crate::provider::Provider::get_schedule) degrades to returning the stale data instead of erroring out.
#[derive(Debug, Error)]
pub enum SyncError {
    /// We are offline and there is nothing cached to show
    #[error("offline, and no cached snapshot is available for {key}")]
    NoDataOffline { key: String },
    /// The fetch failed and there is nothing cached to fall back to
    #[error("fetch failed, and no cached snapshot is available for {key}: {source}")]
    FetchFailedNoCache { key: String, source: FetchError },
    #[error(transparent)]
    Cache(#[from] CacheError),
}
