//! Library-level default settings
//!
//! The freshness TTL itself is always an explicit argument of [`Provider::get_schedule`](crate::provider::Provider::get_schedule); these values are only the defaults a caller can start from.

use chrono::Duration;
use once_cell::sync::Lazy;

/// How long a cached snapshot is served without attempting a refresh
pub static DEFAULT_TTL: Lazy<Duration> = Lazy::new(|| Duration::hours(1));

/// Snapshots older than this are removed by the housekeeping pass that follows a successful refresh
pub static DEFAULT_PURGE_MAX_AGE: Lazy<Duration> = Lazy::new(|| Duration::days(7));

/// Prefix of every key this crate writes into the backing [`ByteStore`](crate::traits::ByteStore).
/// Keys outside this prefix are never touched, so the store can be shared with other data.
pub const CACHE_KEY_PREFIX: &str = "timetable_cache_";
