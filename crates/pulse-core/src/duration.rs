//! Duration formatting for timers, totals, averages and breaks.
//!
//! All formatters floor to whole seconds. Negative durations are treated as
//! zero rather than rendered with a sign.

use chrono::TimeDelta;

/// Whole non-negative seconds in `duration`.
fn whole_seconds(duration: TimeDelta) -> i64 {
    duration.num_seconds().max(0)
}

/// Formats a duration as zero-padded `HH:MM:SS`.
///
/// Hours are not capped, so a 100 hour total renders as `100:00:00`.
pub fn format_hms(duration: TimeDelta) -> String {
    let total = whole_seconds(duration);
    let hours = total / 3600;
    let minutes = total / 60 % 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Formats a real number of seconds as `HH:MM:SS`.
///
/// Fractional seconds are floored. NaN and negative input render as `00:00:00`.
#[expect(clippy::cast_possible_truncation, reason = "input is floored and positive")]
pub fn format_seconds(seconds: f64) -> String {
    if seconds.is_nan() || seconds <= 0.0 {
        return format_hms(TimeDelta::zero());
    }
    let floored = seconds.floor() as i64;
    format_hms(TimeDelta::try_seconds(floored).unwrap_or(TimeDelta::MAX))
}

/// Formats a duration as compact `H:MM`, used for averages.
pub fn format_hm(duration: TimeDelta) -> String {
    let total = whole_seconds(duration);
    let hours = total / 3600;
    let minutes = total / 60 % 60;
    format!("{hours}:{minutes:02}")
}

/// Formats a break: whole minutes (`15m`) under an hour, `H:MM` otherwise.
pub fn format_break(duration: TimeDelta) -> String {
    let total = whole_seconds(duration);
    if total < 3600 {
        format!("{}m", total / 60)
    } else {
        format_hm(duration)
    }
}

/// Parses an `HH:MM:SS` string back into a duration.
///
/// Minutes and seconds must be below 60. Returns `None` for anything else.
pub fn parse_hms(text: &str) -> Option<TimeDelta> {
    let mut parts = text.split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds: i64 = parts.next()?.parse().ok()?;
    if parts.next().is_some()
        || hours < 0
        || !(0..60).contains(&minutes)
        || !(0..60).contains(&seconds)
    {
        return None;
    }
    TimeDelta::try_seconds(hours.checked_mul(3600)?.checked_add(minutes * 60 + seconds)?)
}
