//! Calendar events

use chrono::{DateTime, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One calendar occurrence, as parsed from a feed.
///
/// This is a plain value: snapshots own their events, and events handed out to callers are copies that never alias the cache's internal state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Stable identifier. Sourced from the feed's `UID` when present, synthesized from (title, start) otherwise
    pub id: String,
    /// The display name of the event (`SUMMARY`)
    pub title: String,
    /// Free-text details (`DESCRIPTION`). Empty when the feed did not provide one
    pub description: String,
    /// Where the event takes place (`LOCATION`). Empty when the feed did not provide one
    pub location: String,
    /// When the event starts
    pub start: DateTime<Local>,
    /// When the event ends.
    /// Malformed feeds may place this before `start`; such events are kept as-is, consumers must tolerate zero or negative durations
    pub end: DateTime<Local>,
    /// Whether the source property carried a date-only value
    pub all_day: bool,
}

impl Event {
    /// Build the identifier used for events whose feed record has no usable `UID`.
    ///
    /// The result only depends on (title, start), so re-parsing the same unchanged feed yields matching ids across runs.
    pub fn synthesized_id(title: &str, start: &DateTime<Local>) -> String {
        let name = format!("{}/{}", start.timestamp(), title);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
            .to_hyphenated()
            .to_string()
    }

    /// How long this event lasts. May be zero or negative for malformed feeds
    pub fn duration(&self) -> Duration {
        self.end.signed_duration_since(self.start)
    }

    /// Whether this event starts on the given calendar day
    pub fn starts_on(&self, day: NaiveDate) -> bool {
        self.start.date_naive() == day
    }
}
