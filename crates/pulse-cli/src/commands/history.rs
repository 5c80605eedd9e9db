//! History command: saved sessions grouped by day, newest day first.

use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use pulse_core::aggregate::{group_by_day, total_duration};
use pulse_core::duration::format_hms;
use pulse_core::{
    Clock, DayStateStore, HistoryFilter, Session, SessionKind, SessionRepository, Timesheet,
};
use serde::Serialize;

/// One day in the JSON output.
#[derive(Debug, Serialize)]
pub struct HistoryDay {
    pub date: NaiveDate,
    pub total_seconds: i64,
    pub sessions: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    #[serde(rename = "type")]
    pub kind: SessionKind,
}

impl From<&Session> for HistoryEntry {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id().to_string(),
            start_time: session.start_time(),
            end_time: session.end_time(),
            duration_seconds: session.duration().map(|d| d.num_seconds()),
            kind: session.kind(),
        }
    }
}

pub fn run<S, C, Tz, W>(
    timesheet: &Timesheet<S, C, Tz>,
    filter: HistoryFilter,
    json: bool,
    output: &mut W,
) -> Result<()>
where
    S: SessionRepository + DayStateStore,
    C: Clock,
    Tz: TimeZone,
    Tz::Offset: Display,
    W: Write,
{
    let sessions = timesheet.history(filter);
    let days: Vec<(NaiveDate, Vec<Session>)> = group_by_day(&sessions, timesheet.timezone())
        .into_iter()
        .rev()
        .collect();

    if json {
        let days: Vec<HistoryDay> = days
            .iter()
            .map(|(date, day_sessions)| HistoryDay {
                date: *date,
                total_seconds: total_duration(day_sessions).num_seconds(),
                sessions: day_sessions.iter().map(HistoryEntry::from).collect(),
            })
            .collect();
        writeln!(output, "{}", serde_json::to_string_pretty(&days)?)?;
        return Ok(());
    }

    writeln!(
        output,
        "{} ({} sessions, {})",
        filter.title(),
        sessions.len(),
        format_hms(total_duration(&sessions))
    )?;
    if days.is_empty() {
        writeln!(output, "No sessions recorded.")?;
        return Ok(());
    }

    let tz = timesheet.timezone();
    for (date, day_sessions) in &days {
        writeln!(output)?;
        writeln!(
            output,
            "{}  {}",
            date.format("%a %Y-%m-%d"),
            format_hms(total_duration(day_sessions))
        )?;
        for session in day_sessions {
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
    }
    Ok(())
}
