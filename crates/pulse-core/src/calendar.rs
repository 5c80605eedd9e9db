//! Calendar-day boundaries.
//!
//! A day starts at local midnight in the caller's time zone. Every grouping,
//! range query and day-ended check goes through these helpers so they agree on
//! which day an instant belongs to.

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Number of calendar days, today included, covered by [`HistoryFilter::Week`].
pub const WEEK_DAYS: i64 = 7;

/// Returns the calendar day that `instant` falls on in `tz`.
pub fn day_of<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// Converts local midnight of `date` to UTC.
///
/// An ambiguous midnight (DST fall-back) resolves to the earlier instant. A
/// midnight skipped by a spring-forward gap falls back to 1am local.
pub fn day_start<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    if let Some(start) = tz.from_local_datetime(&midnight).earliest() {
        return start.with_timezone(&Utc);
    }
    let one_am = midnight + TimeDelta::hours(1);
    tz.from_local_datetime(&one_am)
        .earliest()
        .map_or_else(|| Utc.from_utc_datetime(&midnight), |dt| dt.with_timezone(&Utc))
}

/// Half-open `[start, end)` UTC range covering `date`.
pub fn day_range<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    (day_start(date, tz), day_start(next_day(date), tz))
}

/// Half-open UTC range covering the last [`WEEK_DAYS`] calendar days ending on `today`.
pub fn week_range<Tz: TimeZone>(today: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let first = today - TimeDelta::days(WEEK_DAYS - 1);
    (day_start(first, tz), day_start(next_day(today), tz))
}

/// Monday-first weeks covering the month that contains `date`.
///
/// The first and last weeks are padded with days from the neighbouring
/// months, so every week has seven days.
pub fn month_weeks(date: NaiveDate) -> Vec<[NaiveDate; 7]> {
    let first = first_of_month(date);
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(first);

    let offset = i64::from(first.weekday().num_days_from_monday());
    let mut monday = first - TimeDelta::days(offset);
    let mut weeks = Vec::new();
    while monday <= last {
        let mut day = monday;
        weeks.push([(); 7].map(|()| {
            let current = day;
            day = next_day(day);
            current
        }));
        monday = day;
    }
    weeks
}

/// The first day of the month containing `date`.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

/// History window used by listings and exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryFilter {
    #[default]
    Today,
    /// The last seven calendar days, today included.
    Week,
    All,
}

impl HistoryFilter {
    /// Display title of the window.
    pub const fn title(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Week => "This Week",
            Self::All => "All Time",
        }
    }

    /// Whether sessions grouped under `date` belong in this window.
    pub fn includes(self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            Self::Today => date == today,
            Self::Week => date <= today && date > today - TimeDelta::days(WEEK_DAYS),
            Self::All => true,
        }
    }

    /// UTC range to query for this window, or `None` for all time.
    pub fn range<Tz: TimeZone>(
        self,
        today: NaiveDate,
        tz: &Tz,
    ) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match self {
            Self::Today => Some(day_range(today, tz)),
            Self::Week => Some(week_range(today, tz)),
            Self::All => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_of_respects_time_zone() {
        let instant = Utc.with_ymd_and_hms(2025, 1, 29, 23, 30, 0).unwrap();
        assert_eq!(day_of(instant, &Utc), date(2025, 1, 29));

        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(day_of(instant, &plus_two), date(2025, 1, 30));
    }

    #[test]
    fn day_range_is_local_midnight_to_midnight() {
        let minus_eight = FixedOffset::west_opt(8 * 3600).unwrap();
        let (start, end) = day_range(date(2025, 1, 29), &minus_eight);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 1, 29, 8, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 30, 8, 0, 0).unwrap());
    }

    #[test]
    fn week_range_covers_seven_days_including_today() {
        let (start, end) = week_range(date(2025, 1, 29), &Utc);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 1, 23, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 30, 0, 0, 0).unwrap());
    }

    #[test]
    fn week_filter_matches_week_range() {
        let today = date(2025, 1, 29);
        assert!(HistoryFilter::Week.includes(date(2025, 1, 23), today));
        assert!(HistoryFilter::Week.includes(today, today));
        assert!(!HistoryFilter::Week.includes(date(2025, 1, 22), today));
        assert!(!HistoryFilter::Week.includes(date(2025, 1, 30), today));
    }

    #[test]
    fn month_weeks_start_on_monday_and_cover_the_month() {
        let weeks = month_weeks(date(2025, 1, 29));
        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks[0][0], date(2024, 12, 30));
        assert_eq!(weeks[0][2], date(2025, 1, 1));
        assert_eq!(weeks[4][4], date(2025, 1, 31));
        assert_eq!(weeks[4][6], date(2025, 2, 2));

        // February 2021 starts on a Monday and fills exactly four weeks.
        let february = month_weeks(date(2021, 2, 14));
        assert_eq!(february.len(), 4);
        assert_eq!(february[0][0], date(2021, 2, 1));
        assert_eq!(february[3][6], date(2021, 2, 28));
    }

    #[test]
    fn today_filter_only_matches_today() {
        let today = date(2025, 1, 29);
        assert!(HistoryFilter::Today.includes(today, today));
        assert!(!HistoryFilter::Today.includes(date(2025, 1, 28), today));
        assert!(HistoryFilter::All.includes(date(1999, 1, 1), today));
        assert_eq!(HistoryFilter::All.range(today, &Utc), None);
    }
}
