//! Cached parse results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::event::Event;

/// One cached, timestamped parse result for a subscription.
///
/// A snapshot is created by the [`Provider`](crate::provider::Provider) after a successful fetch+parse, persisted by the [`CacheStore`](crate::cache::CacheStore), and superseded on every successful refresh.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The feed/group this snapshot belongs to
    pub subscription_key: String,
    /// The parsed events, sorted ascending by start time
    pub events: Vec<Event>,
    /// When the raw bytes were retrieved (not when they were parsed)
    pub fetched_at: DateTime<Utc>,
    /// Hash of the raw feed bytes, used to skip re-parsing identical payloads
    pub raw_digest: Option<String>,
}

impl Snapshot {
    pub fn new(subscription_key: &str, events: Vec<Event>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            subscription_key: subscription_key.to_string(),
            events,
            fetched_at,
            raw_digest: None,
        }
    }

    pub fn with_digest(mut self, digest: String) -> Self {
        self.raw_digest = Some(digest);
        self
    }

    /// The digest stored in [`Snapshot::raw_digest`]: lowercase hex SHA-256 of the raw bytes
    pub fn digest_of(bytes: &[u8]) -> String {
        let hash = Sha256::digest(bytes);
        hash.iter().map(|byte| format!("{:02x}", byte)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_hex_sha256() {
        // Well-known SHA-256 of the empty input
        assert_eq!(
            Snapshot::digest_of(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(Snapshot::digest_of(b"abc").len(), 64);
    }
}
