//! Timestamp and severity classification for single log lines.
//!
//! [`classify`] turns one raw line into a [`LogEntry`]. It never fails: a
//! line with no recognizable timestamp keeps its full text as the message,
//! and a line with no recognizable severity is [`LogLevel::Unknown`].

use std::borrow::Cow;

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{LogEntry, LogLevel, StreamKind};

/// Only this many leading bytes of a line are searched for a timestamp.
pub const MAX_TIMESTAMP_PREFIX: usize = 96;

/// Characters stripped from both ends of a timestamp candidate.
const WRAPPERS: &[char] = &['[', ']', '(', ')', '{', '}', '<', '>'];

/// Characters stripped from the start of the message after a timestamp.
const MESSAGE_LEAD: &[char] = &[')', ']', '}', '>', ' ', '\t'];

/// ANSI CSI color/style sequences.
static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap_or_else(|_| unreachable!()));

/// Numeric UTC offset written without a colon, e.g. `+0200`.
static OFFSET_WITHOUT_COLON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([+-]\d{2})(\d{2})$").unwrap_or_else(|_| unreachable!()));

/// Severity patterns in precedence order. The first match wins.
static LEVEL_PATTERNS: Lazy<Vec<(LogLevel, Regex)>> = Lazy::new(|| {
    [
        (LogLevel::Panic, r"(?i)\b(?:panic|emergency)\b"),
        (LogLevel::Fatal, r"(?i)\b(?:fatal|critical|crit)\b"),
        (LogLevel::Error, r"(?i)\b(?:error|err|fail|failed|exception)\b"),
        (LogLevel::Warn, r"(?i)\b(?:warn|warning|wrn)\b"),
        (LogLevel::Info, r"(?i)\b(?:info|inf|notice|log)\b"),
        (LogLevel::Debug, r"(?i)\b(?:debug|dbg)\b"),
        (LogLevel::Trace, r"(?i)\b(?:trace|trc)\b"),
    ]
    .into_iter()
    .map(|(level, pattern)| (level, Regex::new(pattern).unwrap_or_else(|_| unreachable!())))
    .collect()
});

/// A timestamp layout: a strict shape check followed by a parse.
///
/// The shape pins field widths so that only well-formed candidates reach
/// the (more permissive) chrono parsers.
#[derive(Clone, Copy)]
struct Layout {
    name: &'static str,
    shape: &'static str,
    parse: fn(&str) -> Option<DateTime<Utc>>,
}

/// Layouts in the order they are tried.
static LAYOUTS: Lazy<Vec<(Layout, Regex)>> = Lazy::new(|| {
    let layouts = [
        Layout {
            name: "rfc3339",
            shape: r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d{1,9})?(?:Z|[+-]\d{2}:\d{2})$",
            parse: parse_rfc3339,
        },
        Layout {
            name: "iso-local",
            shape: r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d{1,9})?$",
            parse: |s| parse_naive(s, "%Y-%m-%dT%H:%M:%S%.f"),
        },
        Layout {
            name: "datetime",
            shape: r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}(?:\.\d{1,9})?$",
            parse: |s| parse_naive(s, "%Y-%m-%d %H:%M:%S%.f"),
        },
        Layout {
            name: "slashed",
            shape: r"^\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2}(?:\.\d{1,9})?$",
            parse: |s| parse_naive(s, "%Y/%m/%d %H:%M:%S%.f"),
        },
        Layout {
            name: "common-log",
            shape: r"^\d{2}/[A-Za-z]{3}/\d{4}:\d{2}:\d{2}:\d{2}(?:\.\d{1,9})? [+-]\d{4}$",
            parse: parse_common_log,
        },
        Layout {
            name: "ansi-c",
            shape: r"^[A-Za-z]{3} [A-Za-z]{3} {1,2}\d{1,2} \d{2}:\d{2}:\d{2}(?:\.\d{1,9})? \d{4}$",
            parse: parse_ansi_c,
        },
        Layout {
            name: "unix-date",
            shape: r"^[A-Za-z]{3} [A-Za-z]{3} {1,2}\d{1,2} \d{2}:\d{2}:\d{2}(?:\.\d{1,9})? [A-Z]{3,5} \d{4}$",
            parse: parse_unix_date,
        },
        Layout {
            name: "ruby-date",
            shape: r"^[A-Za-z]{3} [A-Za-z]{3} \d{2} \d{2}:\d{2}:\d{2}(?:\.\d{1,9})? [+-]\d{4} \d{4}$",
            parse: parse_ruby_date,
        },
    ];
    layouts
        .into_iter()
        .map(|layout| {
            let shape = Regex::new(layout.shape).unwrap_or_else(|_| unreachable!());
            (layout, shape)
        })
        .collect()
});

/// Classifies one raw line from the given stream.
///
/// `raw` should not include its line terminator.
#[must_use]
pub fn classify(raw: &str, stream: StreamKind) -> LogEntry {
    let (timestamp, rest) = extract_timestamp(raw);
    let level = detect_level(rest);
    LogEntry {
        timestamp,
        level,
        message: clean_message(rest),
        stream,
        raw: raw.to_string(),
    }
}

/// Finds a timestamp at the start of `line`.
///
/// Every prefix of the first [`MAX_TIMESTAMP_PREFIX`] bytes is tried and
/// the longest prefix that parses wins. Returns the timestamp (in UTC) and
/// the rest of the line; with no match, the whole trimmed line.
#[must_use]
pub fn extract_timestamp(line: &str) -> (Option<DateTime<Utc>>, &str) {
    let line = line.trim();
    if line.is_empty() {
        return (None, "");
    }

    // Every layout starts with a digit or a letter.
    let lead = line.trim_start_matches(WRAPPERS);
    if !lead.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return (None, line);
    }

    let window = line.len().min(MAX_TIMESTAMP_PREFIX);
    let mut found = None;
    for end in (1..=window).filter(|&end| line.is_char_boundary(end)) {
        if let Some(timestamp) = parse_timestamp(&line[..end]) {
            found = Some((timestamp, end));
        }
    }

    match found {
        Some((timestamp, end)) => {
            let message = line[end..].trim().trim_start_matches(MESSAGE_LEAD);
            (Some(timestamp), message)
        }
        None => (None, line),
    }
}

/// Parses a complete timestamp candidate.
///
/// Surrounding whitespace and bracket characters are ignored, a comma
/// before fractional seconds is accepted, and an offset written as `+hhmm`
/// is retried as `+hh:mm`.
#[must_use]
pub fn parse_timestamp(candidate: &str) -> Option<DateTime<Utc>> {
    let sanitized = candidate.trim().trim_matches(WRAPPERS);
    if sanitized.is_empty() {
        return None;
    }
    let sanitized = normalize_fraction_separator(sanitized);

    if let Some(timestamp) = try_layouts(&sanitized, LAYOUTS.iter()) {
        return Some(timestamp);
    }

    let caps = OFFSET_WITHOUT_COLON.captures(&sanitized)?;
    let whole = caps.get(0)?;
    let with_colon = format!("{}{}:{}", &sanitized[..whole.start()], &caps[1], &caps[2]);
    try_layouts(
        &with_colon,
        LAYOUTS.iter().filter(|(layout, _)| layout.name == "rfc3339"),
    )
}

/// Detects the severity of a message.
#[must_use]
pub fn detect_level(message: &str) -> LogLevel {
    LEVEL_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(message))
        .map_or(LogLevel::Unknown, |(level, _)| *level)
}

/// Removes ANSI escape sequences and surrounding whitespace.
#[must_use]
pub fn clean_message(message: &str) -> String {
    ANSI_ESCAPE.replace_all(message, "").trim().to_string()
}

fn try_layouts<'a>(
    value: &str,
    layouts: impl Iterator<Item = &'a (Layout, Regex)>,
) -> Option<DateTime<Utc>> {
    layouts
        .filter(|(_, shape)| shape.is_match(value))
        .find_map(|(layout, _)| (layout.parse)(value))
}

/// Rewrites `12:00:00,500` as `12:00:00.500`.
fn normalize_fraction_separator(value: &str) -> Cow<'_, str> {
    match value.split_once(',') {
        Some((head, tail)) if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) => {
            Cow::Owned(format!("{head}.{tail}"))
        }
        _ => Cow::Borrowed(value),
    }
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn parse_naive(value: &str, format: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, format)
        .ok()
        .map(|t| t.and_utc())
}

fn parse_common_log(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(value, "%d/%b/%Y:%H:%M:%S%.f %z")
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// `Mon Jan _2 15:04:05 2006`
fn parse_ansi_c(value: &str) -> Option<DateTime<Utc>> {
    let [weekday, month, day, time, year] = fields(value)?;
    if !is_weekday(weekday) {
        return None;
    }
    parse_naive(&format!("{month} {day} {time} {year}"), "%b %d %H:%M:%S%.f %Y")
}

/// `Mon Jan _2 15:04:05 MST 2006`; zone abbreviations carry no offset.
fn parse_unix_date(value: &str) -> Option<DateTime<Utc>> {
    let [weekday, month, day, time, _zone, year] = fields(value)?;
    if !is_weekday(weekday) {
        return None;
    }
    parse_naive(&format!("{month} {day} {time} {year}"), "%b %d %H:%M:%S%.f %Y")
}

/// `Mon Jan 02 15:04:05 -0700 2006`
fn parse_ruby_date(value: &str) -> Option<DateTime<Utc>> {
    let [weekday, month, day, time, offset, year] = fields(value)?;
    if !is_weekday(weekday) {
        return None;
    }
    DateTime::parse_from_str(
        &format!("{month} {day} {time} {offset} {year}"),
        "%b %d %H:%M:%S%.f %z %Y",
    )
    .ok()
    .map(|t| t.with_timezone(&Utc))
}

fn fields<const N: usize>(value: &str) -> Option<[&str; N]> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    parts.try_into().ok()
}

/// The weekday is checked by name only, not against the date.
fn is_weekday(name: &str) -> bool {
    ["mon", "tue", "wed", "thu", "fri", "sat", "sun"]
        .iter()
        .any(|day| day.eq_ignore_ascii_case(name))
}
