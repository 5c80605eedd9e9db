//! Timer commands: `pulse start`, `stop`, `end-day` and `resume-day`.
//!
//! A command the timer cannot take in its current state is not a failure:
//! it prints a notice naming the state and the command exits successfully.

use std::fmt::Display;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::TimeZone;
use pulse_core::duration::{format_break, format_hm, format_hms};
use pulse_core::{
    Clock, DayStateStore, InvalidTransition, Outcome, Session, SessionRepository, TimerState,
    Timesheet,
};

pub fn start<S, C, Tz, W>(timesheet: &mut Timesheet<S, C, Tz>, output: &mut W) -> Result<()>
where
    S: SessionRepository + DayStateStore,
    C: Clock,
    Tz: TimeZone,
    Tz::Offset: Display,
    W: Write,
{
    match timesheet.start().context("failed to start timer")? {
        Outcome::Applied(since) => {
            let local = since.with_timezone(timesheet.timezone());
            writeln!(output, "Timer started at {}", local.format("%H:%M:%S"))?;
        }
        Outcome::Ignored(rejected) => write_ignored(output, &rejected)?,
    }
    Ok(())
}

pub fn stop<S, C, Tz, W>(timesheet: &mut Timesheet<S, C, Tz>, output: &mut W) -> Result<()>
where
    S: SessionRepository + DayStateStore,
    C: Clock,
    Tz: TimeZone,
    W: Write,
{
    match timesheet.stop().context("failed to save stopped session")? {
        Outcome::Applied(session) => {
            write_stopped(output, &session)?;
            writeln!(output, "Today: {}", format_hms(timesheet.today_total()))?;
        }
        Outcome::Ignored(rejected) => write_ignored(output, &rejected)?,
    }
    Ok(())
}

/// Ends the day and prints the day's summary.
pub fn end_day<S, C, Tz, W>(timesheet: &mut Timesheet<S, C, Tz>, output: &mut W) -> Result<()>
where
    S: SessionRepository + DayStateStore,
    C: Clock,
    Tz: TimeZone,
    W: Write,
{
    let stopped = match timesheet.end_day().context("failed to end the day")? {
        Outcome::Applied(stopped) => stopped,
        Outcome::Ignored(rejected) => return write_ignored(output, &rejected),
    };
    if let Some(session) = &stopped {
        write_stopped(output, session)?;
    }

    let summary = timesheet.day_summary(timesheet.today());
    writeln!(output, "Day ended.")?;
    writeln!(output, "  Sessions:   {}", summary.session_count)?;
    writeln!(output, "  Total:      {}", format_hms(summary.total))?;
    if let Some(average) = summary.average {
        writeln!(output, "  Average:    {}", format_hm(average))?;
    }
    if let Some(gap) = summary.last_break {
        writeln!(output, "  Last break: {}", format_break(gap))?;
    }
    Ok(())
}

pub fn resume_day<S, C, Tz, W>(timesheet: &mut Timesheet<S, C, Tz>, output: &mut W) -> Result<()>
where
    S: SessionRepository + DayStateStore,
    C: Clock,
    Tz: TimeZone,
    W: Write,
{
    match timesheet.resume_day().context("failed to resume the day")? {
        Outcome::Applied(()) => writeln!(output, "Day resumed.")?,
        Outcome::Ignored(rejected) => write_ignored(output, &rejected)?,
    }
    Ok(())
}

fn write_stopped<W: Write>(output: &mut W, session: &Session) -> Result<()> {
    writeln!(
        output,
        "Stopped session {} ({})",
        session.id().short(),
        session.formatted_duration()
    )?;
    Ok(())
}

fn write_ignored<W: Write>(output: &mut W, rejected: &InvalidTransition) -> Result<()> {
    let hint = match rejected.state {
        TimerState::DayEnded => " (run `pulse resume-day` first)",
        TimerState::Idle | TimerState::Running { .. } => "",
    };
    writeln!(output, "Nothing to do: {rejected}{hint}")?;
    Ok(())
}
