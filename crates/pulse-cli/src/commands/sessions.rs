//! Manual session management: `pulse add`, `edit` and `delete`.

use std::fmt::Display;
use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, TimeZone, Utc};
use pulse_core::{Clock, DayStateStore, Session, SessionRepository, Timesheet};

use super::util::{parse_datetime, resolve_session_id};

pub fn add<S, C, Tz, W>(
    timesheet: &mut Timesheet<S, C, Tz>,
    start: &str,
    end: &str,
    output: &mut W,
) -> Result<()>
where
    S: SessionRepository + DayStateStore,
    C: Clock,
    Tz: TimeZone,
    Tz::Offset: Display,
    W: Write,
{
    let start = parse_datetime(start, timesheet.now(), timesheet.timezone())?;
    let end = parse_datetime(end, timesheet.now(), timesheet.timezone())?;
    let session = timesheet
        .add_manual_session(start, end)
        .context("failed to add session")?;

    write_session(output, "Added", &session, timesheet.timezone())
}

/// Changes one or both times of a saved session.
pub fn edit<S, C, Tz, W>(
    timesheet: &mut Timesheet<S, C, Tz>,
    id: &str,
    start: Option<&str>,
    end: Option<&str>,
    output: &mut W,
) -> Result<()>
where
    S: SessionRepository + DayStateStore,
    C: Clock,
    Tz: TimeZone,
    Tz::Offset: Display,
    W: Write,
{
    if start.is_none() && end.is_none() {
        bail!("nothing to change, pass --start and/or --end");
    }
    let id = resolve_session_id(timesheet.sessions(), id)?;
    let current = timesheet
        .sessions()
        .iter()
        .find(|s| s.id() == id)
        .cloned()
        .with_context(|| format!("session {id} disappeared"))?;

    let start = parse_or(start, current.start_time(), timesheet)?;
    let end = match (end, current.end_time()) {
        (Some(end), _) => parse_datetime(end, timesheet.now(), timesheet.timezone())?,
        (None, Some(end)) => end,
        (None, None) => bail!("session {} has no end time, pass --end", id.short()),
    };

    let edited = timesheet
        .update_session(id, start, end)
        .context("failed to update session")?;
    write_session(output, "Updated", &edited, timesheet.timezone())
}

pub fn delete<S, C, Tz, W>(timesheet: &mut Timesheet<S, C, Tz>, id: &str, output: &mut W) -> Result<()>
where
    S: SessionRepository + DayStateStore,
    C: Clock,
    Tz: TimeZone,
    Tz::Offset: Display,
    W: Write,
{
    let id = resolve_session_id(timesheet.sessions(), id)?;
    let removed = timesheet
        .delete_session(id)
        .context("failed to delete session")?;
    write_session(output, "Deleted", &removed, timesheet.timezone())
}

fn parse_or<S, C, Tz>(
    input: Option<&str>,
    fallback: DateTime<Utc>,
    timesheet: &Timesheet<S, C, Tz>,
) -> Result<DateTime<Utc>>
where
    S: SessionRepository + DayStateStore,
    C: Clock,
    Tz: TimeZone,
{
    input.map_or(Ok(fallback), |text| {
        parse_datetime(text, timesheet.now(), timesheet.timezone())
    })
}

fn write_session<W, Tz>(output: &mut W, verb: &str, session: &Session, tz: &Tz) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let start = session.start_time().with_timezone(tz);
    let end = session
        .end_time()
        .map_or_else(|| "now".to_string(), |end| end.with_timezone(tz).format("%H:%M").to_string());
    writeln!(
        output,
        "{verb} {} session {} on {}: {}-{} ({})",
        session.kind().as_str().to_lowercase(),
        session.id().short(),
        start.format("%Y-%m-%d"),
        start.format("%H:%M"),
        end,
        session.formatted_duration()
    )?;
    Ok(())
}
