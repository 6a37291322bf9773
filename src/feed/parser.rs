//! The feed parser itself

use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::event::Event;

/// Parse raw feed text into events.
///
/// This never fails: unparsable individual records are skipped and reported in the returned warnings, they do not abort the whole parse. \
/// The returned events are sorted ascending by start time (stable, ties keep their encounter order).
pub fn parse(raw_text: &str) -> (Vec<Event>, Vec<String>) {
    let mut events = Vec::new();
    let mut warnings = Vec::new();

    let mut current: Option<PartialRecord> = None;

    for (index, logical) in unfold_lines(raw_text).iter().enumerate() {
        let line = logical.trim();
        let line_number = index + 1;

        if line == "BEGIN:VEVENT" {
            if current.is_some() {
                warnings.push(format!(
                    "line {}: BEGIN:VEVENT inside an open record, discarding the incomplete one",
                    line_number
                ));
            }
            current = Some(PartialRecord::default());
        } else if line == "END:VEVENT" {
            // An END without a matching BEGIN is ignored, like any other line outside a record
            if let Some(record) = current.take() {
                if record.invalid {
                    // A property-level warning already explains why this record is unusable
                    continue;
                }
                match record.finish() {
                    Ok(event) => events.push(event),
                    Err(reason) => warnings.push(format!(
                        "record ending at line {} skipped: {}",
                        line_number, reason
                    )),
                }
            }
        } else if let Some(record) = current.as_mut() {
            if let Some((name, params, value)) = split_property(line) {
                record.apply(name, params, value, line_number, &mut warnings);
            }
        }
    }

    // sort_by_key is stable, ties keep the feed's encounter order
    events.sort_by_key(|event| event.start);

    (events, warnings)
}

/// Reassemble logical lines: a physical line starting with a single space or tab continues the previous one, minus that one leading character.
/// Physical lines are split on CRLF or LF.
fn unfold_lines(raw_text: &str) -> Vec<String> {
    let mut logical: Vec<String> = Vec::new();

    for physical in raw_text.split('\n') {
        let physical = physical.strip_suffix('\r').unwrap_or(physical);

        let is_continuation = physical.starts_with(' ') || physical.starts_with('\t');
        match logical.last_mut() {
            Some(previous) if is_continuation => previous.push_str(&physical[1..]),
            _ => logical.push(physical.to_string()),
        }
    }

    logical
}

/// Split a `PROPERTY[;PARAMS]:VALUE` line. Returns `None` when there is no `:` at all.
fn split_property(line: &str) -> Option<(&str, Option<&str>, &str)> {
    let colon = line.find(':')?;
    let name_and_params = &line[..colon];
    let value = &line[colon + 1..];

    match name_and_params.find(';') {
        Some(semi) => Some((
            &name_and_params[..semi],
            Some(&name_and_params[semi + 1..]),
            value,
        )),
        None => Some((name_and_params, None, value)),
    }
}

fn has_date_marker(params: Option<&str>) -> bool {
    params.map_or(false, |params| {
        params.split(';').any(|param| param == "VALUE=DATE")
    })
}

/// A record being accumulated between `BEGIN:VEVENT` and `END:VEVENT`
#[derive(Default)]
struct PartialRecord {
    uid: Option<String>,
    title: Option<String>,
    description: String,
    location: String,
    start: Option<DateTime<Local>>,
    end: Option<DateTime<Local>>,
    all_day: bool,
    /// Set when a date property failed to decode. The record is dropped at END even if a later line re-supplied the property
    invalid: bool,
}

impl PartialRecord {
    fn apply(
        &mut self,
        name: &str,
        params: Option<&str>,
        value: &str,
        line_number: usize,
        warnings: &mut Vec<String>,
    ) {
        match name {
            "UID" => self.uid = Some(value.to_string()),
            "SUMMARY" => self.title = Some(unescape_text(value)),
            "DESCRIPTION" => self.description = unescape_text(value),
            "LOCATION" => self.location = unescape_text(value),
            "DTSTART" => match decode_datetime(value) {
                Ok(start) => {
                    self.start = Some(start);
                    self.all_day = has_date_marker(params);
                }
                Err(reason) => {
                    warnings.push(format!("line {}: unusable DTSTART: {}", line_number, reason));
                    self.invalid = true;
                }
            },
            "DTEND" => match decode_datetime(value) {
                Ok(end) => self.end = Some(end),
                Err(reason) => {
                    warnings.push(format!("line {}: unusable DTEND: {}", line_number, reason));
                    self.invalid = true;
                }
            },
            // every other property is ignored
            _ => {}
        }
    }

    fn finish(self) -> Result<Event, String> {
        let title = self.title.unwrap_or_default();
        if title.is_empty() {
            return Err("missing or empty SUMMARY".to_string());
        }
        let start = self.start.ok_or("missing DTSTART")?;
        let end = self.end.ok_or("missing DTEND")?;

        let id = match self.uid {
            Some(uid) if !uid.trim().is_empty() => uid,
            _ => Event::synthesized_id(&title, &start),
        };

        Ok(Event {
            id,
            title,
            description: self.description,
            location: self.location,
            start,
            end,
            all_day: self.all_day,
        })
    }
}

/// Decode the two accepted date shapes.
///
/// * 8 digits `YYYYMMDD`: a date-only value, local midnight.
/// * `YYYYMMDDTHHMMSS`, optionally suffixed with `Z`: a date-time, read as UTC when the `Z` is present and as naive local time otherwise.
///
/// A trailing numeric offset (`+HH:MM`/`-HH:MM`) is truncated and ignored; proper offset handling would need a timezone database this crate deliberately does not carry.
fn decode_datetime(value: &str) -> Result<DateTime<Local>, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("empty value".to_string());
    }

    let is_utc = trimmed.ends_with('Z');
    let stripped = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    let numeric = match stripped.find(|c| c == '+' || c == '-') {
        Some(offset_start) => &stripped[..offset_start],
        None => stripped,
    };

    if numeric.len() == 8 {
        let midnight = decode_date(numeric)?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| format!("invalid date '{}'", value))?;
        to_local(midnight, false)
    } else if numeric.len() >= 15 {
        if numeric.as_bytes().get(8) != Some(&b'T') {
            return Err(format!("expected a 'T' date/time separator in '{}'", value));
        }
        let date_part = numeric
            .get(..8)
            .ok_or_else(|| format!("unsupported date shape '{}'", value))?;
        let date = decode_date(date_part)?;
        let hour = digits(numeric, 9, 11)?;
        let minute = digits(numeric, 11, 13)?;
        // An unparsable seconds field counts as 0
        let second = digits(numeric, 13, 15).unwrap_or(0);
        let time = NaiveTime::from_hms_opt(hour, minute, second)
            .ok_or_else(|| format!("invalid time of day in '{}'", value))?;
        to_local(NaiveDateTime::new(date, time), is_utc)
    } else {
        Err(format!("unsupported date shape '{}'", value))
    }
}

fn decode_date(digits_8: &str) -> Result<NaiveDate, String> {
    let year = digits(digits_8, 0, 4)? as i32;
    let month = digits(digits_8, 4, 6)?;
    let day = digits(digits_8, 6, 8)?;
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| format!("invalid calendar date '{}'", digits_8))
}

fn digits(value: &str, from: usize, to: usize) -> Result<u32, String> {
    value
        .get(from..to)
        .and_then(|part| part.parse::<u32>().ok())
        .ok_or_else(|| format!("expected digits at positions {}..{} of '{}'", from, to, value))
}

fn to_local(naive: NaiveDateTime, is_utc: bool) -> Result<DateTime<Local>, String> {
    if is_utc {
        return Ok(Utc.from_utc_datetime(&naive).with_timezone(&Local));
    }
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(datetime) => Ok(datetime),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => Err(format!("local time {} does not exist", naive)),
    }
}

/// Replace the feed's text escapes: `\n`, `\,`, `\;` and `\\`.
/// Unknown escape sequences pass through unchanged.
fn unescape_text(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => unescaped.push('\n'),
            Some(',') => unescaped.push(','),
            Some(';') => unescaped.push(';'),
            Some('\\') => unescaped.push('\\'),
            Some(other) => {
                unescaped.push('\\');
                unescaped.push(other);
            }
            None => unescaped.push('\\'),
        }
    }

    unescaped.trim().to_string()
}
