//! History bounds for `--oldest` / `--latest`.
//!
//! Slack timestamps pass through untouched; anything else is read as a past
//! time expression like "2h ago", "yesterday" or "2024-01-15".

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Matches: "2h ago", "30m ago", "1d ago", "2w ago", "1mo ago"
static RELATIVE_AGO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*(mo|w|d|h|m)\s+ago$").expect("valid ago regex"));

/// Resolves a history bound to the value sent to the API.
pub fn resolve_bound(input: &str, now: DateTime<Utc>) -> Result<String, String> {
    let raw = input.trim();
    if is_slack_timestamp(raw) {
        return Ok(raw.to_string());
    }
    parse_past_time(raw, now).map(|seconds| seconds.to_string())
}

fn is_slack_timestamp(value: &str) -> bool {
    !value.is_empty() && value.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Parse a past time expression into a Unix timestamp.
///
/// # Supported formats
/// - Relative: "2h ago", "1d ago", "2w ago", "1mo ago" (30 days)
/// - Named: "today", "yesterday"
/// - Date: "2024-01-15" (UTC midnight)
/// - RFC3339: "2024-01-15T10:00:00Z"
pub fn parse_past_time(input: &str, now: DateTime<Utc>) -> Result<i64, String> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err("empty time expression".to_string());
    }

    let lower = raw.to_lowercase();
    match lower.as_str() {
        "today" => return Ok(start_of_day(now).timestamp()),
        "yesterday" => return Ok(start_of_day(now - Duration::days(1)).timestamp()),
        _ => {}
    }

    if let Some(caps) = RELATIVE_AGO_RE.captures(&lower) {
        let value: i64 = caps[1]
            .parse()
            .map_err(|_| format!("invalid number in {raw:?}"))?;
        if value < 1 {
            return Err(format!("invalid relative time {raw:?}"));
        }
        let duration = match &caps[2] {
            "mo" => value.checked_mul(30).and_then(Duration::try_days),
            "w" => Duration::try_weeks(value),
            "d" => Duration::try_days(value),
            "h" => Duration::try_hours(value),
            "m" => Duration::try_minutes(value),
            unit => return Err(format!("invalid time unit {unit:?}")),
        };
        return duration
            .and_then(|duration| now.checked_sub_signed(duration))
            .map(|dt| dt.timestamp())
            .ok_or_else(|| format!("invalid relative time {raw:?}"));
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let dt = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| format!("invalid date {raw:?}"))?;
        return Ok(Utc.from_utc_datetime(&dt).timestamp());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp());
    }

    Err(format!("invalid time expression {raw:?}"))
}

fn start_of_day(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(dt)
}
