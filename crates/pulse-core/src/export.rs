//! Report payloads for CSV and document renderers.
//!
//! [`build_report`] turns an already-filtered, newest-first session list into
//! display rows. [`render_csv`] is the one renderer kept in the core because
//! its header and column order are a compatibility contract for scripts.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::aggregate::{group_by_day, total_duration};
use crate::calendar::{HistoryFilter, day_range};
use crate::duration::format_hms;
use crate::session::{Session, SessionKind};

/// End-time column value for a session that has not finished.
pub const IN_PROGRESS: &str = "In Progress";

/// CSV header row.
pub const CSV_HEADER: &str = "Date,Start Time,End Time,Duration,Type";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// What to export: one calendar day or a history window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportScope {
    Day(NaiveDate),
    History(HistoryFilter),
}

impl ExportScope {
    /// Report title.
    pub fn label(&self) -> String {
        match self {
            Self::Day(date) => date.format(DATE_FORMAT).to_string(),
            Self::History(HistoryFilter::All) => "All Sessions".to_string(),
            Self::History(filter) => filter.title().to_string(),
        }
    }

    /// UTC range to fetch from storage, or `None` for everything.
    pub fn range<Tz: TimeZone>(
        &self,
        today: NaiveDate,
        tz: &Tz,
    ) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match self {
            Self::Day(date) => Some(day_range(*date, tz)),
            Self::History(filter) => filter.range(today, tz),
        }
    }

    /// Picks the sessions in scope, newest day first.
    ///
    /// Within a day the input order is kept.
    pub fn select<Tz: TimeZone>(&self, sessions: &[Session], today: NaiveDate, tz: &Tz) -> Vec<Session> {
        let grouped = group_by_day(sessions, tz);
        grouped
            .into_iter()
            .rev()
            .filter(|(date, _)| match self {
                Self::Day(day) => date == day,
                Self::History(filter) => filter.includes(*date, today),
            })
            .flat_map(|(_, day_sessions)| day_sessions)
            .collect()
    }
}

impl fmt::Display for ExportScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// One rendered session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub date: String,
    pub start_time: String,
    /// End time, or [`IN_PROGRESS`].
    pub end_time: String,
    pub duration: String,
    #[serde(rename = "type")]
    pub kind: SessionKind,
}

/// A complete report: summary header fields plus rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub title: String,
    pub session_count: usize,
    pub total_seconds: i64,
    pub total_formatted: String,
    pub rows: Vec<ReportRow>,
}

/// Builds a report, keeping the order of `sessions`.
pub fn build_report<Tz>(sessions: &[Session], title: &str, tz: &Tz) -> Report
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let total = total_duration(sessions);
    let rows = sessions
        .iter()
        .map(|session| {
            let start = session.start_time().with_timezone(tz);
            let end_time = session.end_time().map_or_else(
                || IN_PROGRESS.to_string(),
                |end| end.with_timezone(tz).format(TIME_FORMAT).to_string(),
            );
            ReportRow {
                date: start.format(DATE_FORMAT).to_string(),
                start_time: start.format(TIME_FORMAT).to_string(),
                end_time,
                duration: session.formatted_duration(),
                kind: session.kind(),
            }
        })
        .collect();

    Report {
        title: title.to_string(),
        session_count: sessions.len(),
        total_seconds: total.num_seconds(),
        total_formatted: format_hms(total),
        rows,
    }
}

/// Renders a report as CSV, one line per row after the header.
pub fn render_csv(report: &Report) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + report.rows.len() * 48);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for row in &report.rows {
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            csv_field(&row.date),
            csv_field(&row.start_time),
            csv_field(&row.end_time),
            csv_field(&row.duration),
            row.kind
        ));
    }
    out
}

/// File name for a saved export, e.g. `pulse_sessions_All_Sessions.csv`.
pub fn suggested_filename(label: &str, extension: &str) -> String {
    format!("pulse_sessions_{}.{extension}", label.replace(' ', "_"))
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}
