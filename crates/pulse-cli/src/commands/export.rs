//! Export command: CSV, JSON or plain-text reports.
//!
//! Sessions are fetched from storage for the scope's time range rather than
//! from the loaded view, so exports of a single day stay cheap on large
//! databases. A running timer is included as an in-progress row.

use std::fmt::{self, Display};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::TimeZone;
use pulse_core::export::{IN_PROGRESS, suggested_filename};
use pulse_core::store::sort_newest_first;
use pulse_core::{
    Clock, DayStateStore, ExportScope, Report, SessionRepository, Timesheet, build_report,
    render_csv,
};

use crate::cli::ExportFormat;

/// Builds the report for `scope`.
pub fn build<S, C, Tz>(timesheet: &Timesheet<S, C, Tz>, scope: ExportScope) -> Result<Report>
where
    S: SessionRepository + DayStateStore,
    C: Clock,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let today = timesheet.today();
    let tz = timesheet.timezone();
    let store = timesheet.store();
    let mut sessions = match scope.range(today, tz) {
        Some((start, end)) => store.fetch_by_range(start, end),
        None => store.fetch_all(),
    }
    .context("failed to load sessions")?;

    if let Some(running) = timesheet.running_session() {
        sessions.push(running);
        sort_newest_first(&mut sessions);
    }

    let selected = scope.select(&sessions, today, tz);
    tracing::debug!(%scope, sessions = selected.len(), "building export");
    Ok(build_report(&selected, &scope.label(), tz))
}

/// Renders a report in the requested format.
pub fn render(report: &Report, format: ExportFormat) -> Result<String> {
    Ok(match format {
        ExportFormat::Csv => render_csv(report),
        ExportFormat::Json => {
            let mut json = serde_json::to_string_pretty(report)?;
            json.push('\n');
            json
        }
        ExportFormat::Text => render_text(report),
    })
}

pub fn run<S, C, Tz, W>(
    timesheet: &Timesheet<S, C, Tz>,
    scope: ExportScope,
    format: ExportFormat,
    destination: Option<&Path>,
    output: &mut W,
) -> Result<()>
where
    S: SessionRepository + DayStateStore,
    C: Clock,
    Tz: TimeZone,
    Tz::Offset: Display,
    W: Write,
{
    let report = build(timesheet, scope)?;
    let rendered = render(&report, format)?;

    let Some(destination) = destination else {
        output.write_all(rendered.as_bytes())?;
        return Ok(());
    };

    let path = resolve_destination(destination, &report.title, format);
    std::fs::write(&path, rendered)
        .with_context(|| format!("failed to write {}", path.display()))?;
    writeln!(
        output,
        "Exported {} sessions to {}",
        report.session_count,
        path.display()
    )?;
    Ok(())
}

/// A directory destination gets a generated file name inside it.
fn resolve_destination(destination: &Path, title: &str, format: ExportFormat) -> PathBuf {
    if destination.is_dir() {
        destination.join(suggested_filename(title, format.extension()))
    } else {
        destination.to_path_buf()
    }
}

// ========== Text Rendering ==========

/// Renders a report as an aligned plain-text table.
pub fn render_text(report: &Report) -> String {
    TextTable(report).to_string()
}

struct TextTable<'a>(&'a Report);

impl fmt::Display for TextTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "{}", report.title)?;
        writeln!(
            f,
            "Sessions: {}  Total: {}",
            report.session_count, report.total_formatted
        )?;
        if report.rows.is_empty() {
            return writeln!(f, "No sessions recorded.");
        }

        let end_width = report
            .rows
            .iter()
            .map(|row| row.end_time.len())
            .max()
            .unwrap_or(0)
            .max("End".len());
        writeln!(f)?;
        writeln!(
            f,
            "{:<10}  {:<5}  {:<end_width$}  {:<8}  Type",
            "Date", "Start", "End", "Duration"
        )?;
        for row in &report.rows {
            writeln!(
                f,
                "{:<10}  {:<5}  {:<end_width$}  {:<8}  {}",
                row.date, row.start_time, row.end_time, row.duration, row.kind
            )?;
        }
        if report.rows.iter().any(|row| row.end_time == IN_PROGRESS) {
            writeln!(f, "\nTotal excludes the running session.")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
    use insta::assert_snapshot;
    use pulse_core::{HistoryFilter, ManualClock, MemoryStore};

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, d, h, m, 0).unwrap()
    }

    /// Two completed sessions today, one yesterday, and the timer running.
    fn running_timesheet() -> Timesheet<MemoryStore, ManualClock, Utc> {
        let clock = ManualClock::new(at(29, 12, 0));
        let mut ts = Timesheet::open(MemoryStore::new(), clock.clone(), Utc).unwrap();
        ts.add_manual_session(at(29, 10, 0), at(29, 11, 30)).unwrap();
        ts.add_manual_session(at(29, 9, 0), at(29, 9, 30)).unwrap();
        ts.add_manual_session(at(28, 9, 0), at(28, 17, 0)).unwrap();
        assert!(ts.start().unwrap().is_applied());
        clock.advance(TimeDelta::minutes(10));
        ts
    }

    #[test]
    fn today_csv_includes_running_session() {
        let ts = running_timesheet();
        let report = build(&ts, ExportScope::History(HistoryFilter::Today)).unwrap();
        let csv = render(&report, ExportFormat::Csv).unwrap();

        assert_eq!(csv.lines().count(), 4);
        assert_snapshot!(csv, @r"
        Date,Start Time,End Time,Duration,Type
        2025-01-29,12:00,In Progress,00:00:00,Automatic
        2025-01-29,10:00,11:30,01:30:00,Manual
        2025-01-29,09:00,09:30,00:30:00,Manual
        ");
    }

    #[test]
    fn single_day_export_uses_range() {
        let ts = running_timesheet();
        let day = NaiveDate::from_ymd_opt(2025, 1, 28).unwrap();
        let report = build(&ts, ExportScope::Day(day)).unwrap();
        assert_eq!(report.title, "2025-01-28");
        assert_eq!(report.session_count, 1);
        assert_eq!(report.total_formatted, "08:00:00");
    }

    #[test]
    fn all_sessions_json() {
        let ts = running_timesheet();
        let report = build(&ts, ExportScope::History(HistoryFilter::All)).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&render(&report, ExportFormat::Json).unwrap()).unwrap();
        assert_eq!(json["title"], "All Sessions");
        assert_eq!(json["session_count"], 4);
        assert_eq!(json["total_seconds"], 10 * 3600);
        assert_eq!(json["rows"][0]["end_time"], IN_PROGRESS);
        assert_eq!(json["rows"][3]["date"], "2025-01-28");
    }

    #[test]
    fn text_table_is_aligned() {
        let ts = running_timesheet();
        let report = build(&ts, ExportScope::History(HistoryFilter::Today)).unwrap();
        assert_snapshot!(render_text(&report), @r"
        Today
        Sessions: 3  Total: 02:00:00

        Date        Start  End          Duration  Type
        2025-01-29  12:00  In Progress  00:00:00  Automatic
        2025-01-29  10:00  11:30        01:30:00  Manual
        2025-01-29  09:00  09:30        00:30:00  Manual

        Total excludes the running session.
        ");
    }

    #[test]
    fn output_directory_gets_suggested_name() {
        let ts = running_timesheet();
        let temp = tempfile::tempdir().unwrap();

        let mut output = Vec::new();
        run(
            &ts,
            ExportScope::History(HistoryFilter::All),
            ExportFormat::Csv,
            Some(temp.path()),
            &mut output,
        )
        .unwrap();

        let path = temp.path().join("pulse_sessions_All_Sessions.csv");
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 5);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            format!("Exported 4 sessions to {}\n", path.display())
        );
    }

    #[test]
    fn empty_scope_still_has_header() {
        let ts = Timesheet::open(MemoryStore::new(), ManualClock::new(at(29, 9, 0)), Utc).unwrap();
        let report = build(&ts, ExportScope::History(HistoryFilter::Week)).unwrap();
        assert_eq!(
            render(&report, ExportFormat::Csv).unwrap(),
            "Date,Start Time,End Time,Duration,Type\n"
        );
        assert_eq!(
            render_text(&report),
            "This Week\nSessions: 0  Total: 00:00:00\nNo sessions recorded.\n"
        );
    }
}
