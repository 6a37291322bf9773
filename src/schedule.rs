//! Day/week/month views over a list of events
//!
//! Pure helpers for the screens that consume [`Provider::get_schedule`](crate::provider::Provider::get_schedule): filter the returned events down to a day, a week or a month. \
//! Everything here derives from [`Event`] values; nothing is stored back on them.

use chrono::{Datelike, Duration, NaiveDate};

use crate::event::Event;

/// One day of a week view
#[derive(Clone, Debug, PartialEq)]
pub struct DaySchedule {
    pub date: NaiveDate,
    /// The day's events, sorted by start time
    pub events: Vec<Event>,
}

/// A full week, Monday to Sunday
#[derive(Clone, Debug, PartialEq)]
pub struct WeekSchedule {
    pub week_start: NaiveDate,
    /// The last day of the week (inclusive)
    pub week_end: NaiveDate,
    /// Exactly 7 entries, one per day, empty days included
    pub days: Vec<DaySchedule>,
}

/// The Monday of the week `day` belongs to
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_monday() as i64)
}

/// The events starting on the given calendar day
pub fn events_on_day(events: &[Event], day: NaiveDate) -> Vec<Event> {
    events
        .iter()
        .filter(|event| event.starts_on(day))
        .cloned()
        .collect()
}

/// The events starting within `[week_start, week_start + 7 days)`
pub fn events_in_week(events: &[Event], week_start: NaiveDate) -> Vec<Event> {
    let week_end = week_start + Duration::days(7);
    events
        .iter()
        .filter(|event| {
            let day = event.start.date_naive();
            day >= week_start && day < week_end
        })
        .cloned()
        .collect()
}

/// The events starting in the given month (`month` is 1-based)
pub fn events_in_month(events: &[Event], year: i32, month: u32) -> Vec<Event> {
    events
        .iter()
        .filter(|event| event.start.year() == year && event.start.month() == month)
        .cloned()
        .collect()
}

/// Organize a week of events into 7 per-day buckets
pub fn week_schedule(events: &[Event], week_start: NaiveDate) -> WeekSchedule {
    let days = (0..7)
        .map(|offset| {
            let date = week_start + Duration::days(offset);
            let mut events = events_on_day(events, date);
            events.sort_by_key(|event| event.start);
            DaySchedule { date, events }
        })
        .collect();

    WeekSchedule {
        week_start,
        week_end: week_start + Duration::days(6),
        days,
    }
}
