//! Derived totals over a snapshot of sessions.
//!
//! Everything here is a pure read. Day membership is decided by the session's
//! start time, using the local-midnight convention from [`crate::calendar`].

use std::collections::BTreeMap;

use chrono::{NaiveDate, TimeDelta, TimeZone};

use crate::calendar::day_of;
use crate::session::Session;

/// Sum of completed durations; in-progress sessions count as zero.
pub fn total_duration<'a>(sessions: impl IntoIterator<Item = &'a Session>) -> TimeDelta {
    sessions
        .into_iter()
        .filter_map(Session::duration)
        .fold(TimeDelta::zero(), |acc, d| acc + d)
}

/// Sessions that start on `date`, most recent first.
pub fn sessions_on<Tz: TimeZone>(sessions: &[Session], date: NaiveDate, tz: &Tz) -> Vec<Session> {
    let mut on_day: Vec<Session> = sessions
        .iter()
        .filter(|s| day_of(s.start_time(), tz) == date)
        .cloned()
        .collect();
    crate::store::sort_newest_first(&mut on_day);
    on_day
}

/// Total completed time for sessions starting on `date`.
pub fn total_for_date<Tz: TimeZone>(sessions: &[Session], date: NaiveDate, tz: &Tz) -> TimeDelta {
    total_duration(sessions.iter().filter(|s| day_of(s.start_time(), tz) == date))
}

/// Today's total, including the running timer's elapsed time when present.
pub fn today_total<Tz: TimeZone>(
    sessions: &[Session],
    today: NaiveDate,
    running_elapsed: Option<TimeDelta>,
    tz: &Tz,
) -> TimeDelta {
    total_for_date(sessions, today, tz) + running_elapsed.unwrap_or_default()
}

/// Groups sessions by the calendar day they start on.
///
/// Within a day the input order is kept, so a newest-first input stays
/// newest-first.
pub fn group_by_day<Tz: TimeZone>(
    sessions: &[Session],
    tz: &Tz,
) -> BTreeMap<NaiveDate, Vec<Session>> {
    let mut grouped: BTreeMap<NaiveDate, Vec<Session>> = BTreeMap::new();
    for session in sessions {
        grouped
            .entry(day_of(session.start_time(), tz))
            .or_default()
            .push(session.clone());
    }
    grouped
}

/// Whether any session starts on `date`.
pub fn has_activity_on<Tz: TimeZone>(sessions: &[Session], date: NaiveDate, tz: &Tz) -> bool {
    sessions.iter().any(|s| day_of(s.start_time(), tz) == date)
}

/// Mean duration of completed sessions, or `None` when there are none.
pub fn average_session_length(sessions: &[Session]) -> Option<TimeDelta> {
    let durations: Vec<TimeDelta> = sessions.iter().filter_map(Session::duration).collect();
    let count = i32::try_from(durations.len()).ok().filter(|&n| n > 0)?;
    let total = durations.into_iter().fold(TimeDelta::zero(), |acc, d| acc + d);
    Some(total / count)
}

/// Gap between the two most recent sessions.
///
/// Both must be completed. Returns `None` with fewer than two sessions, when
/// the most recent one is still running, or when they overlap.
pub fn last_break(sessions: &[Session]) -> Option<TimeDelta> {
    let mut ordered: Vec<&Session> = sessions.iter().collect();
    ordered.sort_by(|a, b| b.start_time().cmp(&a.start_time()));

    let [latest, previous, ..] = ordered.as_slice() else {
        return None;
    };
    latest.end_time()?;
    let gap = latest.start_time() - previous.end_time()?;
    (gap >= TimeDelta::zero()).then_some(gap)
}

/// Fraction of `goal` reached by `total`, clamped to `[0, 1]`.
#[expect(
    clippy::cast_precision_loss,
    reason = "second counts stay far below 2^52"
)]
pub fn goal_progress(total: TimeDelta, goal: TimeDelta) -> f64 {
    if goal <= TimeDelta::zero() {
        return 0.0;
    }
    let ratio = total.num_seconds() as f64 / goal.num_seconds() as f64;
    ratio.clamp(0.0, 1.0)
}

/// End-of-day figures for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub session_count: usize,
    pub total: TimeDelta,
    pub average: Option<TimeDelta>,
    pub last_break: Option<TimeDelta>,
}

impl DaySummary {
    /// Summarises the sessions starting on `date`.
    pub fn for_date<Tz: TimeZone>(sessions: &[Session], date: NaiveDate, tz: &Tz) -> Self {
        let on_day = sessions_on(sessions, date, tz);
        Self {
            date,
            session_count: on_day.len(),
            total: total_duration(&on_day),
            average: average_session_length(&on_day),
            last_break: last_break(&on_day),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, Utc};

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, d, h, m, 0).unwrap()
    }

    fn manual(start: DateTime<Utc>, end: DateTime<Utc>) -> Session {
        Session::manual(start, end).expect("valid range")
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[test]
    fn total_for_date_includes_manual_entry() {
        let sessions = vec![manual(at(29, 8, 0), at(29, 9, 30))];
        assert_eq!(total_for_date(&sessions, date(29), &Utc), TimeDelta::seconds(5400));
        assert_eq!(total_for_date(&sessions, date(28), &Utc), TimeDelta::zero());
    }

    #[test]
    fn today_total_adds_running_elapsed_and_skips_other_days() {
        let sessions = vec![
            manual(at(29, 8, 0), at(29, 9, 0)),
            manual(at(28, 8, 0), at(28, 12, 0)),
            Session::in_progress(at(29, 10, 0)),
        ];
        let idle = today_total(&sessions, date(29), None, &Utc);
        assert_eq!(idle, TimeDelta::hours(1));

        let running = today_total(&sessions, date(29), Some(TimeDelta::seconds(42)), &Utc);
        assert_eq!(running, TimeDelta::hours(1) + TimeDelta::seconds(42));
    }

    #[test]
    fn grouping_uses_local_day_of_start() {
        let late_evening = manual(at(29, 23, 0), at(29, 23, 30));
        let morning = manual(at(29, 9, 0), at(29, 10, 0));
        let sessions = vec![late_evening.clone(), morning.clone()];

        let utc = group_by_day(&sessions, &Utc);
        assert_eq!(utc.len(), 1);
        assert_eq!(utc[&date(29)], vec![late_evening.clone(), morning.clone()]);

        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let shifted = group_by_day(&sessions, &plus_two);
        assert_eq!(shifted[&date(30)], vec![late_evening]);
        assert_eq!(shifted[&date(29)], vec![morning]);
    }

    #[test]
    fn sessions_on_sorts_newest_first() {
        let first = manual(at(29, 8, 0), at(29, 9, 0));
        let second = manual(at(29, 13, 0), at(29, 14, 0));
        let sessions = vec![first.clone(), second.clone()];
        assert_eq!(sessions_on(&sessions, date(29), &Utc), vec![second, first]);
    }

    #[test]
    fn has_activity_on_checks_start_day() {
        let sessions = vec![manual(at(29, 23, 0), at(30, 1, 0))];
        assert!(has_activity_on(&sessions, date(29), &Utc));
        assert!(!has_activity_on(&sessions, date(30), &Utc));
    }

    #[test]
    fn average_of_no_sessions_is_none() {
        assert_eq!(average_session_length(&[]), None);
        assert_eq!(average_session_length(&[Session::in_progress(at(29, 9, 0))]), None);
    }

    #[test]
    fn average_ignores_in_progress_sessions() {
        let sessions = vec![
            manual(at(29, 8, 0), at(29, 9, 0)),
            manual(at(29, 10, 0), at(29, 12, 0)),
            Session::in_progress(at(29, 13, 0)),
        ];
        assert_eq!(average_session_length(&sessions), Some(TimeDelta::minutes(90)));
    }

    #[test]
    fn last_break_is_gap_between_two_latest_sessions() {
        let sessions = vec![
            manual(at(29, 9, 0), at(29, 10, 0)),
            manual(at(29, 10, 15), at(29, 11, 0)),
        ];
        let gap = last_break(&sessions).expect("two completed sessions");
        assert_eq!(gap, TimeDelta::minutes(15));
        assert_eq!(crate::duration::format_break(gap), "15m");
    }

    #[test]
    fn last_break_needs_two_completed_sessions() {
        assert_eq!(last_break(&[manual(at(29, 9, 0), at(29, 10, 0))]), None);

        let running_latest = vec![
            manual(at(29, 9, 0), at(29, 10, 0)),
            Session::in_progress(at(29, 10, 30)),
        ];
        assert_eq!(last_break(&running_latest), None);
    }

    #[test]
    fn last_break_ignores_overlap() {
        let sessions = vec![
            manual(at(29, 9, 0), at(29, 11, 0)),
            manual(at(29, 10, 0), at(29, 12, 0)),
        ];
        assert_eq!(last_break(&sessions), None);
    }

    #[test]
    fn goal_progress_is_clamped() {
        let goal = TimeDelta::hours(8);
        assert!((goal_progress(TimeDelta::hours(4), goal) - 0.5).abs() < f64::EPSILON);
        assert!((goal_progress(TimeDelta::hours(10), goal) - 1.0).abs() < f64::EPSILON);
        assert!(goal_progress(TimeDelta::hours(1), TimeDelta::zero()).abs() < f64::EPSILON);
    }

    #[test]
    fn day_summary_collects_figures() {
        let sessions = vec![
            manual(at(29, 9, 0), at(29, 10, 0)),
            manual(at(29, 10, 15), at(29, 11, 15)),
            manual(at(28, 9, 0), at(28, 17, 0)),
        ];
        let summary = DaySummary::for_date(&sessions, date(29), &Utc);
        assert_eq!(summary.session_count, 2);
        assert_eq!(summary.total, TimeDelta::hours(2));
        assert_eq!(summary.average, Some(TimeDelta::hours(1)));
        assert_eq!(summary.last_break, Some(TimeDelta::minutes(15)));
    }
}
