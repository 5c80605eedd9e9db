//! Status command: timer state plus today's figures.

use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone};
use pulse_core::aggregate::goal_progress;
use pulse_core::duration::{format_break, format_hm, format_hms};
use pulse_core::{Clock, DayStateStore, SessionRepository, TimerState, Timesheet};
use serde::Serialize;

/// Everything `pulse status` shows, computed once.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub state: TimerState,
    pub elapsed_seconds: i64,
    pub today_total_seconds: i64,
    pub today_sessions: usize,
    pub average_session_seconds: Option<i64>,
    pub last_break_seconds: Option<i64>,
    pub goal_seconds: i64,
    pub goal_progress: f64,
    /// Stopped sessions still waiting to be saved.
    pub pending: usize,
}

impl StatusReport {
    pub fn collect<S, C, Tz>(timesheet: &Timesheet<S, C, Tz>, goal: TimeDelta) -> Self
    where
        S: SessionRepository + DayStateStore,
        C: Clock,
        Tz: TimeZone,
    {
        let today = timesheet.today();
        let summary = timesheet.day_summary(today);
        let total = timesheet.today_total();
        Self {
            date: today,
            state: timesheet.state(),
            elapsed_seconds: timesheet.elapsed().num_seconds(),
            today_total_seconds: total.num_seconds(),
            today_sessions: summary.session_count,
            average_session_seconds: summary.average.map(|d| d.num_seconds()),
            last_break_seconds: summary.last_break.map(|d| d.num_seconds()),
            goal_seconds: goal.num_seconds(),
            goal_progress: goal_progress(total, goal),
            pending: timesheet.pending().len(),
        }
    }
}

pub fn run<S, C, Tz, W>(
    timesheet: &Timesheet<S, C, Tz>,
    goal: TimeDelta,
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
    let report = StatusReport::collect(timesheet, goal);
    if json {
        writeln!(output, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }
    write_text(output, &report, timesheet.timezone())
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "percent is rounded from a fraction clamped to [0, 1]"
)]
fn write_text<W, Tz>(output: &mut W, report: &StatusReport, tz: &Tz) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let state = match report.state {
        TimerState::Running { since } => {
            let local: DateTime<Tz> = since.with_timezone(tz);
            format!("running since {}", local.format("%H:%M"))
        }
        TimerState::Idle => "idle".to_string(),
        TimerState::DayEnded => "day ended".to_string(),
    };
    let percent = (report.goal_progress * 100.0).round() as u32;

    writeln!(output, "Pulse status for {}", report.date)?;
    writeln!(output, "State:      {state}")?;
    if matches!(report.state, TimerState::Running { .. }) {
        writeln!(output, "Elapsed:    {}", format_seconds(report.elapsed_seconds))?;
    }
    writeln!(
        output,
        "Today:      {} ({percent}% of {} goal)",
        format_seconds(report.today_total_seconds),
        format_hm(TimeDelta::seconds(report.goal_seconds))
    )?;
    writeln!(output, "Sessions:   {}", report.today_sessions)?;
    if let Some(average) = report.average_session_seconds {
        writeln!(output, "Average:    {}", format_hm(TimeDelta::seconds(average)))?;
    }
    if let Some(gap) = report.last_break_seconds {
        writeln!(output, "Last break: {}", format_break(TimeDelta::seconds(gap)))?;
    }
    if report.pending > 0 {
        writeln!(output, "Unsaved:    {} session(s) waiting to be written", report.pending)?;
    }
    Ok(())
}

fn format_seconds(seconds: i64) -> String {
    format_hms(TimeDelta::seconds(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use insta::assert_snapshot;
    use pulse_core::{ManualClock, MemoryStore};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 29, h, m, 0).unwrap()
    }

    fn render(ts: &Timesheet<MemoryStore, ManualClock, Utc>, json: bool) -> String {
        let mut output = Vec::new();
        run(ts, TimeDelta::hours(8), json, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn status_while_running_shows_elapsed_and_goal() {
        let clock = ManualClock::new(at(9, 0));
        let mut ts = Timesheet::open(MemoryStore::new(), clock.clone(), Utc).unwrap();
        ts.add_manual_session(at(7, 0), at(8, 45)).unwrap();
        assert!(ts.start().unwrap().is_applied());
        clock.advance(TimeDelta::minutes(15));
        ts.tick().unwrap();

        assert_snapshot!(render(&ts, false), @r"
        Pulse status for 2025-01-29
        State:      running since 09:00
        Elapsed:    00:15:00
        Today:      02:00:00 (25% of 8:00 goal)
        Sessions:   1
        Average:    1:45
        ");
    }

    #[test]
    fn status_idle_with_break() {
        let clock = ManualClock::new(at(12, 0));
        let mut ts = Timesheet::open(MemoryStore::new(), clock, Utc).unwrap();
        ts.add_manual_session(at(9, 0), at(10, 0)).unwrap();
        ts.add_manual_session(at(10, 15), at(11, 0)).unwrap();

        assert_snapshot!(render(&ts, false), @r"
        Pulse status for 2025-01-29
        State:      idle
        Today:      01:45:00 (22% of 8:00 goal)
        Sessions:   2
        Average:    0:52
        Last break: 15m
        ");
    }

    #[test]
    fn status_json_is_machine_readable() {
        let clock = ManualClock::new(at(9, 0));
        let mut ts = Timesheet::open(MemoryStore::new(), clock.clone(), Utc).unwrap();
        assert!(ts.start().unwrap().is_applied());
        clock.advance(TimeDelta::hours(4));
        ts.tick().unwrap();

        let json: serde_json::Value = serde_json::from_str(&render(&ts, true)).unwrap();
        assert_eq!(json["state"], "running");
        assert_eq!(json["since"], "2025-01-29T09:00:00Z");
        assert_eq!(json["elapsed_seconds"], 4 * 3600);
        assert_eq!(json["today_total_seconds"], 4 * 3600);
        assert_eq!(json["goal_progress"], 0.5);
        assert_eq!(json["average_session_seconds"], serde_json::Value::Null);
    }
}
