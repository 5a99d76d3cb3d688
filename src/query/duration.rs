//! Time-window normalization for SkyWalking `Duration` inputs.
//!
//! Tool callers express time in several shapes: signed relative durations
//! ("-30m", "1h30m"), legacy day/hour shorthands ("7d", "24h"), absolute
//! timestamps in a handful of layouts, and the "now" keyword. Everything
//! funnels into a [`DurationRange`] whose start/end strings are already
//! formatted at the granularity the OAP expects for the chosen step.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Window applied when a tool gives neither a duration nor explicit bounds.
pub const DEFAULT_DURATION_MINUTES: i64 = 30;

const NOW_KEYWORD: &str = "now";

/// Query granularity understood by the OAP backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Step {
    Day,
    Hour,
    Minute,
    Second,
}

impl Step {
    /// Timestamp layout the OAP expects for this granularity.
    fn layout(self) -> &'static str {
        match self {
            Step::Day => "%Y-%m-%d",
            Step::Hour => "%Y-%m-%d %H",
            Step::Minute => "%Y-%m-%d %H%M",
            Step::Second => "%Y-%m-%d %H%M%S",
        }
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DAY" => Ok(Step::Day),
            "HOUR" => Ok(Step::Hour),
            "MINUTE" => Ok(Step::Minute),
            "SECOND" => Ok(Step::Second),
            other => Err(format!("unknown step '{other}'")),
        }
    }
}

/// Normalized time window, serialized as the GraphQL `Duration` input.
///
/// `cold_stage` is attached only when explicitly true so that queries
/// against the regular stage keep the exact wire shape older backends expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationRange {
    pub start: String,
    pub end: String,
    pub step: Step,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cold_stage: Option<bool>,
}

/// Render a timestamp at the granularity matching `step`.
pub fn format_time_by_step(time: NaiveDateTime, step: Step) -> String {
    time.format(step.layout()).to_string()
}

/// Parse a duration expression relative to the local clock.
///
/// Signed durations open a window between now and now+d (negative values
/// look backwards). Inputs the duration grammar rejects fall back to the
/// legacy day/hour shorthand, and anything else becomes a 7-day window.
/// This never fails: garbage input degrades to the widest default.
pub fn parse_duration(input: &str, cold_stage: bool) -> DurationRange {
    parse_duration_at(input, cold_stage, Local::now().naive_local())
}

pub(crate) fn parse_duration_at(
    input: &str,
    cold_stage: bool,
    now: NaiveDateTime,
) -> DurationRange {
    let (start, end, step) = match parse_go_duration(input) {
        Some(offset) => {
            let (start, end) = if offset < Duration::zero() {
                (now + offset, now)
            } else {
                (now, now + offset)
            };
            (start, end, adaptive_step(start, end))
        }
        None => parse_legacy_duration(input, now),
    };

    DurationRange {
        start: format_time_by_step(start, step),
        end: format_time_by_step(end, step),
        step,
        cold_stage: cold_stage.then_some(true),
    }
}

/// Build a window from explicit `start`/`end` strings, falling back to the
/// relative-duration path when both are empty.
///
/// Bounds accept absolute layouts, signed offsets from now, and the "now"
/// keyword. A missing start defaults to 30 minutes ago, a missing end to
/// now. When `step` is absent or unknown, granularity adapts to the span.
pub fn build_duration(
    start: &str,
    end: &str,
    step: Option<&str>,
    cold_stage: bool,
    default_minutes: i64,
) -> DurationRange {
    build_duration_at(
        start,
        end,
        step,
        cold_stage,
        default_minutes,
        Local::now().naive_local(),
    )
}

pub(crate) fn build_duration_at(
    start: &str,
    end: &str,
    step: Option<&str>,
    cold_stage: bool,
    default_minutes: i64,
    now: NaiveDateTime,
) -> DurationRange {
    if start.is_empty() && end.is_empty() {
        let minutes = if default_minutes <= 0 {
            DEFAULT_DURATION_MINUTES
        } else {
            default_minutes
        };
        return parse_duration_at(&format!("-{minutes}m"), cold_stage, now);
    }

    let start_time = parse_time_string(start, now - Duration::minutes(DEFAULT_DURATION_MINUTES), now);
    let end_time = parse_time_string(end, now, now);

    let step = step
        .and_then(|s| s.parse::<Step>().ok())
        .unwrap_or_else(|| adaptive_step(start_time, end_time));

    DurationRange {
        start: format_time_by_step(start_time, step),
        end: format_time_by_step(end_time, step),
        step,
        cold_stage: cold_stage.then_some(true),
    }
}

/// Pick a granularity proportional to the window span so responses stay
/// small enough for an LLM context.
fn adaptive_step(start: NaiveDateTime, end: NaiveDateTime) -> Step {
    let span = end - start;
    if span >= Duration::days(7) {
        Step::Day
    } else if span >= Duration::hours(24) {
        Step::Hour
    } else if span >= Duration::hours(1) {
        Step::Minute
    } else {
        Step::Second
    }
}

/// Legacy shorthand: a trailing 'd'/'D' or 'h'/'H' with an optional count.
/// Unparseable counts and unrecognized inputs widen to 7 days.
fn parse_legacy_duration(input: &str, now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime, Step) {
    if let Some(count) = input.strip_suffix(['d', 'D'])
        && !count.is_empty()
    {
        let days = count.parse::<i64>().ok().filter(|d| *d > 0).unwrap_or(7);
        return (now - Duration::days(days), now, Step::Day);
    }

    if let Some(count) = input.strip_suffix(['h', 'H'])
        && !count.is_empty()
    {
        let hours = count.parse::<i64>().ok().filter(|h| *h > 0).unwrap_or(1);
        return (now - Duration::hours(hours), now, Step::Hour);
    }

    (now - Duration::days(7), now, Step::Day)
}

/// Resolve a single time bound: empty picks `default`, "now" picks `now`,
/// a signed duration offsets from now, otherwise try the absolute layouts.
fn parse_time_string(input: &str, default: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
    if input.is_empty() {
        return default;
    }
    if input.eq_ignore_ascii_case(NOW_KEYWORD) {
        return now;
    }
    if let Some(offset) = parse_go_duration(input) {
        return now + offset;
    }
    parse_absolute_time(input).unwrap_or(default)
}

/// Absolute timestamp layouts accepted for explicit bounds, most to least
/// precise. Hour-only inputs ("2025-07-06 15") are handled separately since
/// chrono cannot express that layout without minutes.
fn parse_absolute_time(input: &str) -> Option<NaiveDateTime> {
    const LAYOUTS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d %H%M%S",
        "%Y-%m-%d %H%M",
    ];

    for layout in LAYOUTS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(input, layout) {
            return Some(parsed);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    // "YYYY-MM-DD HH" layout.
    if let Some((date_part, hour_part)) = input.rsplit_once(' ')
        && hour_part.len() <= 2
        && let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        && let Ok(hour) = hour_part.parse::<u32>()
    {
        return date.and_hms_opt(hour, 0, 0);
    }

    None
}

/// Parse Go's duration grammar: an optional sign followed by number/unit
/// pairs with units ns, us, ms, s, m and h. Days are deliberately not a
/// unit here so that "7d" reaches the legacy path instead.
fn parse_go_duration(input: &str) -> Option<Duration> {
    let (negative, rest) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };

    if rest == "0" {
        return Some(Duration::zero());
    }
    if rest.is_empty() {
        return None;
    }

    let mut total_nanos: i64 = 0;
    let mut cursor = rest;
    while !cursor.is_empty() {
        let number_len = cursor
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(cursor.len());
        if number_len == 0 {
            return None;
        }
        let value: f64 = cursor[..number_len].parse().ok()?;
        cursor = &cursor[number_len..];

        let (nanos_per_unit, unit_len) = if cursor.starts_with("ns") {
            (1.0, 2)
        } else if cursor.starts_with("us") {
            (1_000.0, 2)
        } else if cursor.starts_with("µs") {
            (1_000.0, "µs".len())
        } else if cursor.starts_with("ms") {
            (1_000_000.0, 2)
        } else if cursor.starts_with('s') {
            (1_000_000_000.0, 1)
        } else if cursor.starts_with('m') {
            (60_000_000_000.0, 1)
        } else if cursor.starts_with('h') {
            (3_600_000_000_000.0, 1)
        } else {
            return None;
        };
        cursor = &cursor[unit_len..];

        total_nanos = total_nanos.checked_add((value * nanos_per_unit) as i64)?;
    }

    let duration = Duration::nanoseconds(total_nanos);
    Some(if negative { -duration } else { duration })
}
