//! Change detection between two snapshots of the same feed
//!
//! This is what drives "your Tuesday class moved" notifications: the [`Provider`](crate::provider::Provider) diffs every fresh parse against the previous cached snapshot and returns the result alongside the events.

use chrono::Duration;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::event::Event;

/// How close two start times must be for the title-based fallback match to consider two events the same occurrence.
///
/// Some feed sources regenerate their ids on every fetch, so identity cannot rely on ids alone. The fallback is deliberately tolerant and is a known source of imprecision: a genuinely new event sharing a title with a removed one on the same day will be reported as `Moved` rather than `Removed`+`Added`. \
/// Use [`detect_changes_with_window`] to tune the window.
pub static DEFAULT_MATCH_WINDOW: Lazy<Duration> = Lazy::new(|| Duration::hours(24));

/// What happened to an event between two snapshots
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Present in the new snapshot only
    Added,
    /// Present in the old snapshot only
    Removed,
    /// Same occurrence, but its start, end or location changed
    Moved,
    /// Same occurrence at the same time and place, but its title or description changed
    Modified,
}

/// One detected difference between two snapshots
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    /// The event as it exists in the new snapshot. Absent for [`ChangeKind::Removed`]
    pub current: Option<Event>,
    /// The event as it existed in the old snapshot. Absent for [`ChangeKind::Added`]
    pub previous: Option<Event>,
}

/// Compare two event collections using the default match window.
///
/// Pure and deterministic: same inputs, same output, no I/O.
pub fn detect_changes(previous: &[Event], current: &[Event]) -> Vec<ChangeRecord> {
    detect_changes_with_window(previous, current, *DEFAULT_MATCH_WINDOW)
}

/// Compare two event collections.
///
/// The output order is a contract consumers may rely on: `Removed` records first (in previous-order), then `Added` (in current-order), then `Moved`/`Modified` interleaved in current-order.
pub fn detect_changes_with_window(
    previous: &[Event],
    current: &[Event],
    window: Duration,
) -> Vec<ChangeRecord> {
    let mut changes = Vec::new();

    for old in previous {
        let survives = current.iter().any(|new| is_same_occurrence(old, new, window));
        if !survives {
            changes.push(ChangeRecord {
                kind: ChangeKind::Removed,
                current: None,
                previous: Some(old.clone()),
            });
        }
    }

    let mut updated = Vec::new();
    for new in current {
        match previous.iter().find(|old| is_same_occurrence(old, new, window)) {
            None => changes.push(ChangeRecord {
                kind: ChangeKind::Added,
                current: Some(new.clone()),
                previous: None,
            }),
            Some(old) => {
                if is_identical(old, new) {
                    continue;
                }
                let moved = old.start != new.start
                    || old.end != new.end
                    || old.location != new.location;
                updated.push(ChangeRecord {
                    kind: if moved { ChangeKind::Moved } else { ChangeKind::Modified },
                    current: Some(new.clone()),
                    previous: Some(old.clone()),
                });
            }
        }
    }

    changes.extend(updated);
    changes
}

/// Whether two events from different snapshots are the same occurrence: equal non-empty ids, or equal titles with start times closer than `window`
fn is_same_occurrence(left: &Event, right: &Event, window: Duration) -> bool {
    if !left.id.is_empty() && left.id == right.id {
        return true;
    }
    if left.title != right.title {
        return false;
    }
    let delta = left.start.signed_duration_since(right.start);
    delta < window && -delta < window
}

fn is_identical(left: &Event, right: &Event) -> bool {
    left.title == right.title
        && left.description == right.description
        && left.location == right.location
        && left.start == right.start
        && left.end == right.end
}
