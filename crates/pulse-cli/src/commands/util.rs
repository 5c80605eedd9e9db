//! Shared utilities for CLI commands.

use anyhow::{Context, bail};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use pulse_core::calendar::day_of;
use pulse_core::{Session, SessionId};
use regex::Regex;

/// Relative time pattern: "N minutes/hours/days/weeks ago".
const RELATIVE_TIME_PATTERN: &str = r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$";

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

/// Parse a user-supplied time.
///
/// Supports:
/// - RFC 3339: "2025-01-29T10:30:00Z"
/// - Local date and time: "2025-01-29 10:30"
/// - Local time today: "10:30"
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
pub fn parse_datetime<Tz: TimeZone>(
    s: &str,
    now: DateTime<Utc>,
    tz: &Tz,
) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M") {
        return resolve_local(&naive, tz, s);
    }

    if let Ok(time) = NaiveTime::parse_from_str(s, "%H:%M") {
        let naive = day_of(now, tz).and_time(time);
        return resolve_local(&naive, tz, s);
    }

    let relative = Regex::new(RELATIVE_TIME_PATTERN).context("failed to compile time pattern")?;
    let Some(caps) = relative.captures(s) else {
        bail!(
            "Invalid time: {s}. Use HH:MM, YYYY-MM-DD HH:MM, RFC 3339 (e.g., 2025-01-29T10:30:00Z) or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let (max_for_unit, minutes_per_unit) = match &caps[2] {
        "minute" => (MAX_RELATIVE_MINUTES, 1),
        "hour" => (MAX_RELATIVE_MINUTES / 60, 60),
        "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
        "week" => (MAX_RELATIVE_MINUTES / (60 * 24 * 7), 60 * 24 * 7),
        unit => bail!("Unknown time unit: {unit}"),
    };

    if n > max_for_unit {
        bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    Ok(now - Duration::minutes(n * minutes_per_unit))
}

/// Parse a calendar day: "today", "yesterday" or YYYY-MM-DD.
pub fn parse_date(s: &str, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    match s.trim() {
        "today" => Ok(today),
        "yesterday" => today
            .pred_opt()
            .context("no day before the earliest supported date"),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
            .with_context(|| format!("Invalid date: {other}. Use YYYY-MM-DD, today or yesterday")),
    }
}

/// Parse a calendar month as YYYY-MM, returning its first day.
pub fn parse_month(s: &str) -> anyhow::Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
        .with_context(|| format!("Invalid month: {s}. Use YYYY-MM"))
}

/// Finds the one session whose ID starts with `prefix`.
pub fn resolve_session_id(sessions: &[Session], prefix: &str) -> anyhow::Result<SessionId> {
    let prefix = prefix.trim().to_ascii_lowercase().replace('-', "");
    if prefix.is_empty() {
        bail!("session ID must not be empty");
    }

    let mut matches = sessions
        .iter()
        .map(Session::id)
        .filter(|id| id.to_string().starts_with(&prefix));
    let Some(first) = matches.next() else {
        bail!("no session matches ID {prefix}");
    };
    if matches.next().is_some() {
        bail!("session ID {prefix} is ambiguous, use more characters");
    }
    Ok(first)
}

fn resolve_local<Tz: TimeZone>(
    naive: &NaiveDateTime,
    tz: &Tz,
    input: &str,
) -> anyhow::Result<DateTime<Utc>> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("{input} does not exist in the local time zone"))
}
