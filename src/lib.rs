//! This crate keeps a local, offline-capable copy of calendar feeds.
//!
//! A feed (a simplified iCalendar/ICS payload) is fetched per *subscription key* by a [`traits::FeedFetcher`] you provide, parsed by the [`feed`] module, and cached in a [`CacheStore`] backed by any [`traits::ByteStore`].
//!
//! These pieces are orchestrated by a [`Provider`](provider::Provider): ask it for the current schedule of a subscription and it will decide whether to serve the cached snapshot, refresh it over the network, or fall back to stale data when the network is unavailable. \
//! On every refresh it also compares the new events against the previous snapshot and reports the differences as [`ChangeRecord`]s, so callers can notify users about added, removed, moved or modified events.

pub mod traits;

pub mod event;
pub use event::Event;
pub mod snapshot;
pub use snapshot::Snapshot;
pub mod feed;
pub mod diff;
pub use diff::{ChangeKind, ChangeRecord};
pub mod cache;
pub use cache::CacheStore;
pub mod store;
pub mod provider;
pub use provider::{Provider, Schedule};

pub mod error;
pub use error::{CacheError, FetchError, SyncError};

pub mod config;
pub mod schedule;
