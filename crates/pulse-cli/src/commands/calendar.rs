//! Calendar command: a month grid marking days with sessions, or the sessions
//! of one selected day.

use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use chrono::{Datelike, NaiveDate, TimeDelta, TimeZone};
use pulse_core::calendar::month_weeks;
use pulse_core::duration::format_hms;
use pulse_core::{Clock, DayStateStore, SessionRepository, Timesheet};

const WEEKDAYS: &str = "Mon Tue Wed Thu Fri Sat Sun";

/// Prints the month containing `month` with active days marked `*`, followed
/// by the total of every active day.
pub fn month<S, C, Tz, W>(
    timesheet: &Timesheet<S, C, Tz>,
    month: NaiveDate,
    output: &mut W,
) -> Result<()>
where
    S: SessionRepository + DayStateStore,
    C: Clock,
    Tz: TimeZone,
    W: Write,
{
    let weeks = month_weeks(month);
    let in_month =
        |date: &NaiveDate| date.year() == month.year() && date.month() == month.month();

    writeln!(output, "{}", month.format("%B %Y"))?;
    writeln!(output, "{WEEKDAYS}")?;
    for week in &weeks {
        let cells: Vec<String> = week
            .iter()
            .map(|date| {
                if !in_month(date) {
                    return "   ".to_string();
                }
                let mark = if timesheet.has_activity_on(*date) { '*' } else { ' ' };
                format!("{:>2}{mark}", date.day())
            })
            .collect();
        writeln!(output, "{}", cells.join(" ").trim_end())?;
    }

    let active: Vec<NaiveDate> = weeks
        .iter()
        .flatten()
        .filter(|date| in_month(*date) && timesheet.has_activity_on(**date))
        .copied()
        .collect();
    writeln!(output)?;
    if active.is_empty() {
        writeln!(output, "No sessions recorded this month.")?;
        return Ok(());
    }

    let mut month_total = TimeDelta::zero();
    for date in &active {
        let total = timesheet.total_for_date(*date);
        month_total += total;
        writeln!(
            output,
            "{}  {}  ({})",
            date.format("%a %Y-%m-%d"),
            format_hms(total),
            session_count(timesheet.sessions_on(*date).len())
        )?;
    }
    writeln!(
        output,
        "Month total: {} on {} day(s)",
        format_hms(month_total),
        active.len()
    )?;
    Ok(())
}

/// Prints the sessions of one day, earliest first, with the day's total.
pub fn day<S, C, Tz, W>(
    timesheet: &Timesheet<S, C, Tz>,
    date: NaiveDate,
    output: &mut W,
) -> Result<()>
where
    S: SessionRepository + DayStateStore,
    C: Clock,
    Tz: TimeZone,
    Tz::Offset: Display,
    W: Write,
{
    let sessions = timesheet.sessions_on(date);
    writeln!(output, "{}", date.format("%A, %B %-d %Y"))?;
    if sessions.is_empty() {
        writeln!(output, "No sessions recorded on this day.")?;
        return Ok(());
    }
    writeln!(
        output,
        "{}, {}",
        session_count(sessions.len()),
        format_hms(timesheet.total_for_date(date))
    )?;

    let tz = timesheet.timezone();
    writeln!(output)?;
    for session in sessions.iter().rev() {
        let start = session.start_time().with_timezone(tz).format("%H:%M");
        let end = session.end_time().map_or_else(
            || "     ".to_string(),
            |end| end.with_timezone(tz).format("%H:%M").to_string(),
        );
        writeln!(
            output,
            "  {}  {start}-{end}  {}  {}",
            session.id().short(),
            session.formatted_duration(),
            session.kind()
        )?;
    }
    Ok(())
}

fn session_count(count: usize) -> String {
    if count == 1 {
        "1 session".to_string()
    } else {
        format!("{count} sessions")
    }
}
