//! The timesheet: timer, session cache and storage behind one owner.
//!
//! Every mutating call follows the same order: compute the next state on a
//! copy, write it to storage, and only then commit it in memory. A failed
//! write leaves the in-memory view exactly as it was, except for `stop`,
//! which has already left the running state and parks the finished session
//! in a pending queue for [`Timesheet::retry_pending`].
//!
//! Mutating calls reconcile the day boundary first, so a day ended before
//! midnight never blocks commands the next morning.

use chrono::{DateTime, Local, NaiveDate, TimeDelta, TimeZone, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregate::{self, DaySummary};
use crate::calendar::{HistoryFilter, day_of};
use crate::clock::{Clock, SystemClock};
use crate::session::{InvalidRange, Session, SessionId};
use crate::store::{DayState, DayStateStore, PersistenceError, SessionRepository, sort_newest_first};
use crate::timer::{InvalidTransition, Outcome, Timer, TimerCommand, TimerState};

/// Errors surfaced by timesheet operations.
#[derive(Debug, Error)]
pub enum TimesheetError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    InvalidRange(#[from] InvalidRange),
    #[error("no session with id {0}")]
    UnknownSession(SessionId),
}

/// Owns the timer, the day state and a newest-first cache of all sessions.
pub struct Timesheet<S, C = SystemClock, Tz = Local>
where
    Tz: TimeZone,
{
    store: S,
    clock: C,
    tz: Tz,
    timer: Timer,
    day: DayState,
    sessions: Vec<Session>,
    pending: Vec<Session>,
}

impl<S, C, Tz> Timesheet<S, C, Tz>
where
    S: SessionRepository + DayStateStore,
    C: Clock,
    Tz: TimeZone,
{
    /// Loads sessions and day state, then reconciles the day boundary.
    ///
    /// A day-ended flag recorded on an earlier calendar day is cleared here,
    /// before any command can run. A running marker whose session is already
    /// saved is dropped rather than restored.
    pub fn open(mut store: S, clock: C, tz: Tz) -> Result<Self, TimesheetError> {
        let mut day = store.load_day_state()?;
        let sessions = store.fetch_all()?;
        debug!(sessions = sessions.len(), ?day, "loaded timesheet");

        let already_saved = day.running_since.is_some_and(|since| {
            sessions
                .iter()
                .any(|s| !s.is_manual_entry() && s.start_time() == since)
        });
        if already_saved {
            warn!(
                since = ?day.running_since,
                "running marker already saved as a session, clearing it"
            );
            day.running_since = None;
            store.save_day_state(&day)?;
        }

        let now = clock.now();
        let timer = Timer::from_day_state(&day, now);
        let mut timesheet = Self {
            store,
            clock,
            tz,
            timer,
            day,
            sessions,
            pending: Vec::new(),
        };
        timesheet.check_day_boundary()?;
        Ok(timesheet)
    }

    /// Clears a stale day-ended flag when the calendar day has changed.
    ///
    /// Returns whether a new day was recorded.
    pub fn check_day_boundary(&mut self) -> Result<bool, TimesheetError> {
        let today = self.today();
        if self.day.last_recorded_day == Some(today) {
            return Ok(false);
        }
        let next = DayState {
            day_ended: false,
            last_recorded_day: Some(today),
            running_since: self.day.running_since,
        };
        self.store.save_day_state(&next)?;
        if self.timer.roll_day() {
            info!(%today, "new day, day-ended flag cleared");
        } else {
            debug!(%today, "recorded new day");
        }
        self.day = next;
        Ok(true)
    }

    /// Starts the timer. Ignored unless idle.
    pub fn start(&mut self) -> Result<Outcome<DateTime<Utc>>, TimesheetError> {
        self.check_day_boundary()?;
        let now = self.clock.now();
        let mut next = self.timer.clone();
        if let Err(rejected) = next.start(now) {
            return Ok(ignore(rejected));
        }
        let day = DayState {
            running_since: Some(now),
            ..self.day.clone()
        };
        self.store.save_day_state(&day)?;
        self.day = day;
        self.timer = next;
        info!(since = %now, "timer started");
        Ok(Outcome::Applied(now))
    }

    /// Refreshes the running elapsed time and the day boundary.
    ///
    /// Returns the elapsed time, or `None` when the timer is not running.
    pub fn tick(&mut self) -> Result<Option<TimeDelta>, TimesheetError> {
        self.check_day_boundary()?;
        Ok(self.timer.tick(self.clock.now()))
    }

    /// Stops the timer and saves the finished session. Ignored unless running.
    ///
    /// The timer leaves the running state before the write. The session and
    /// the cleared running marker are written together; if that fails the
    /// session is kept for [`retry_pending`](Self::retry_pending) and the
    /// marker stays in storage, so a restart recovers the interval instead
    /// of losing it.
    pub fn stop(&mut self) -> Result<Outcome<Session>, TimesheetError> {
        self.check_day_boundary()?;
        let session = match self.timer.stop(self.clock.now()) {
            Ok(session) => session,
            Err(rejected) => return Ok(ignore(rejected)),
        };

        let day = DayState {
            running_since: None,
            ..self.day.clone()
        };
        if let Err(err) = self.store.record_stop(&session, &day) {
            warn!(error = %err, "failed to save stopped session, keeping it for retry");
            self.pending.push(session);
            return Err(err.into());
        }
        info!(
            id = %session.id(),
            seconds = session.duration().unwrap_or_default().num_seconds(),
            "timer stopped"
        );
        self.day = day;
        self.cache_insert(session.clone());
        Ok(Outcome::Applied(session))
    }

    /// Ends the work day, stopping a running timer first.
    ///
    /// Returns the session recorded by the implicit stop, if any. If that
    /// stop fails to save, the error is returned and the day stays open.
    pub fn end_day(&mut self) -> Result<Outcome<Option<Session>>, TimesheetError> {
        self.check_day_boundary()?;
        if self.timer.state() == TimerState::DayEnded {
            return Ok(ignore(InvalidTransition {
                command: TimerCommand::EndDay,
                state: TimerState::DayEnded,
            }));
        }
        let stopped = if self.timer.is_running() {
            self.stop()?.applied()
        } else {
            None
        };

        let mut next = self.timer.clone();
        if let Err(rejected) = next.end_day() {
            return Ok(ignore(rejected));
        }
        let day = DayState {
            day_ended: true,
            last_recorded_day: Some(self.today()),
            running_since: None,
        };
        self.store.save_day_state(&day)?;
        self.day = day;
        self.timer = next;
        info!("work day ended");
        Ok(Outcome::Applied(stopped))
    }

    /// Reopens an ended day. Ignored unless the day was ended.
    pub fn resume_day(&mut self) -> Result<Outcome<()>, TimesheetError> {
        self.check_day_boundary()?;
        let mut next = self.timer.clone();
        if let Err(rejected) = next.resume_day() {
            return Ok(ignore(rejected));
        }
        let day = DayState {
            day_ended: false,
            ..self.day.clone()
        };
        self.store.save_day_state(&day)?;
        self.day = day;
        self.timer = next;
        info!("work day resumed");
        Ok(Outcome::Applied(()))
    }

    /// Records a manual session. The range is checked before storage is touched.
    pub fn add_manual_session(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Session, TimesheetError> {
        let session = Session::manual(start, end)?;
        self.check_day_boundary()?;
        self.store.insert(&session)?;
        info!(id = %session.id(), "manual session added");
        self.cache_insert(session.clone());
        Ok(session)
    }

    /// Moves a saved session to new times; the duration follows.
    pub fn update_session(
        &mut self,
        id: SessionId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Session, TimesheetError> {
        let index = self.index_of(id)?;
        let edited = self.sessions[index].with_times(start, end)?;
        self.check_day_boundary()?;
        self.store.update(&edited)?;
        info!(%id, "session updated");
        self.sessions[index] = edited.clone();
        sort_newest_first(&mut self.sessions);
        Ok(edited)
    }

    /// Deletes a saved session, returning it.
    pub fn delete_session(&mut self, id: SessionId) -> Result<Session, TimesheetError> {
        let index = self.index_of(id)?;
        self.check_day_boundary()?;
        self.store.delete(id)?;
        info!(%id, "session deleted");
        Ok(self.sessions.remove(index))
    }

    /// Writes sessions whose save failed earlier, oldest first.
    ///
    /// Each session is written together with the day state, which keeps the
    /// running marker only if a newer timer is running. Stops at the first
    /// failure; the rest stay queued. Returns how many were written.
    pub fn retry_pending(&mut self) -> Result<usize, TimesheetError> {
        let mut written = 0;
        while let Some(session) = self.pending.first().cloned() {
            let day = DayState {
                running_since: self.timer.running_since(),
                ..self.day.clone()
            };
            self.store.record_stop(&session, &day)?;
            self.pending.remove(0);
            self.day = day;
            self.cache_insert(session);
            written += 1;
        }
        if written > 0 {
            info!(written, "pending sessions saved");
        }
        Ok(written)
    }

    /// Reloads the session cache from storage.
    pub fn reload(&mut self) -> Result<(), TimesheetError> {
        self.sessions = self.store.fetch_all()?;
        debug!(sessions = self.sessions.len(), "reloaded sessions");
        Ok(())
    }

    // ========== Views ==========

    pub const fn state(&self) -> TimerState {
        self.timer.state()
    }

    pub const fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    /// Elapsed time of the running timer as of the last tick.
    pub const fn elapsed(&self) -> TimeDelta {
        self.timer.elapsed()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        day_of(self.clock.now(), &self.tz)
    }

    pub const fn timezone(&self) -> &Tz {
        &self.tz
    }

    pub const fn day_state(&self) -> &DayState {
        &self.day
    }

    /// All saved sessions, most recent first.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Finished sessions that could not be saved yet.
    pub fn pending(&self) -> &[Session] {
        &self.pending
    }

    /// The running timer as an in-progress session.
    pub fn running_session(&self) -> Option<Session> {
        self.timer.running_since().map(Session::in_progress)
    }

    pub fn today_sessions(&self) -> Vec<Session> {
        self.sessions_on(self.today())
    }

    /// Saved sessions starting on `date`, most recent first.
    pub fn sessions_on(&self, date: NaiveDate) -> Vec<Session> {
        aggregate::sessions_on(&self.sessions, date, &self.tz)
    }

    /// Saved time today plus the running timer.
    pub fn today_total(&self) -> TimeDelta {
        let running = self.timer.is_running().then_some(self.timer.elapsed());
        aggregate::today_total(&self.sessions, self.today(), running, &self.tz)
    }

    pub fn total_for_date(&self, date: NaiveDate) -> TimeDelta {
        aggregate::total_for_date(&self.sessions, date, &self.tz)
    }

    pub fn has_activity_on(&self, date: NaiveDate) -> bool {
        aggregate::has_activity_on(&self.sessions, date, &self.tz)
    }

    pub fn day_summary(&self, date: NaiveDate) -> DaySummary {
        DaySummary::for_date(&self.sessions, date, &self.tz)
    }

    /// Saved sessions inside a history window, most recent first.
    pub fn history(&self, filter: HistoryFilter) -> Vec<Session> {
        let today = self.today();
        self.sessions
            .iter()
            .filter(|s| filter.includes(day_of(s.start_time(), &self.tz), today))
            .cloned()
            .collect()
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn index_of(&self, id: SessionId) -> Result<usize, TimesheetError> {
        self.sessions
            .iter()
            .position(|s| s.id() == id)
            .ok_or(TimesheetError::UnknownSession(id))
    }

    fn cache_insert(&mut self, session: Session) {
        self.sessions.push(session);
        sort_newest_first(&mut self.sessions);
    }
}

fn ignore<T>(rejected: InvalidTransition) -> Outcome<T> {
    warn!(command = %rejected.command, state = %rejected.state, "ignoring timer command");
    Outcome::Ignored(rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::MemoryStore;

    fn at(d: u32, h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, d, h, m, s).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn open_at(store: MemoryStore, now: DateTime<Utc>) -> (Timesheet<MemoryStore, ManualClock, Utc>, ManualClock) {
        let clock = ManualClock::new(now);
        let timesheet = Timesheet::open(store, clock.clone(), Utc).expect("open timesheet");
        (timesheet, clock)
    }

    #[test]
    fn five_ticks_then_stop_records_five_seconds() {
        let (mut ts, clock) = open_at(MemoryStore::new(), at(29, 9, 0, 0));

        assert!(ts.start().unwrap().is_applied());
        for _ in 0..5 {
            clock.advance(TimeDelta::seconds(1));
            ts.tick().unwrap();
        }
        assert_eq!(ts.elapsed(), TimeDelta::seconds(5));
        assert_eq!(ts.today_total(), TimeDelta::seconds(5));

        let session = ts.stop().unwrap().applied().expect("stop applies");
        assert_eq!(session.start_time(), at(29, 9, 0, 0));
        assert_eq!(session.end_time(), Some(at(29, 9, 0, 5)));
        assert_eq!(session.duration(), Some(TimeDelta::seconds(5)));
        assert_eq!(session.formatted_duration(), "00:00:05");
        assert!(!session.is_manual_entry());

        assert_eq!(ts.state(), TimerState::Idle);
        assert_eq!(ts.elapsed(), TimeDelta::zero());
        assert_eq!(ts.store().sessions(), std::slice::from_ref(&session));
        assert_eq!(ts.store().day_state().running_since, None);
    }

    #[test]
    fn start_then_stop_without_ticks_has_zero_duration() {
        let (mut ts, _clock) = open_at(MemoryStore::new(), at(29, 9, 0, 0));
        ts.start().unwrap();
        let session = ts.stop().unwrap().applied().unwrap();
        assert_eq!(session.duration(), Some(TimeDelta::zero()));
        assert!(!session.is_manual_entry());
    }

    #[test]
    fn stop_without_start_changes_nothing() {
        let (mut ts, _clock) = open_at(MemoryStore::new(), at(29, 9, 0, 0));
        let before = ts.store().day_state().clone();

        let outcome = ts.stop().unwrap();
        assert!(matches!(
            outcome,
            Outcome::Ignored(InvalidTransition { command: TimerCommand::Stop, state: TimerState::Idle })
        ));
        assert!(ts.store().sessions().is_empty());
        assert_eq!(ts.store().day_state(), &before);

        ts.end_day().unwrap();
        let before = ts.store().day_state().clone();
        assert!(!ts.stop().unwrap().is_applied());
        assert!(ts.store().sessions().is_empty());
        assert_eq!(ts.store().day_state(), &before);
    }

    #[test]
    fn double_start_is_ignored() {
        let (mut ts, clock) = open_at(MemoryStore::new(), at(29, 9, 0, 0));
        ts.start().unwrap();
        clock.advance(TimeDelta::minutes(5));
        assert!(!ts.start().unwrap().is_applied());
        assert_eq!(ts.state(), TimerState::Running { since: at(29, 9, 0, 0) });
    }

    #[test]
    fn end_day_while_running_saves_exactly_one_session() {
        let (mut ts, clock) = open_at(MemoryStore::new(), at(29, 9, 0, 0));
        ts.start().unwrap();
        clock.advance(TimeDelta::minutes(30));

        let stopped = ts.end_day().unwrap().applied().expect("end day applies");
        assert_eq!(stopped.and_then(|s| s.duration()), Some(TimeDelta::minutes(30)));
        assert_eq!(ts.store().sessions().len(), 1);
        assert_eq!(ts.state(), TimerState::DayEnded);
        assert!(ts.store().day_state().day_ended);

        assert!(!ts.start().unwrap().is_applied());
        assert!(!ts.end_day().unwrap().is_applied());
        assert_eq!(ts.store().sessions().len(), 1);
    }

    #[test]
    fn resume_day_allows_starting_again() {
        let (mut ts, _clock) = open_at(MemoryStore::new(), at(29, 9, 0, 0));
        assert!(!ts.resume_day().unwrap().is_applied());

        ts.end_day().unwrap();
        assert!(ts.resume_day().unwrap().is_applied());
        assert_eq!(ts.state(), TimerState::Idle);
        assert!(!ts.store().day_state().day_ended);
        assert!(ts.start().unwrap().is_applied());
    }

    #[test]
    fn day_ended_yesterday_resets_on_first_load_today() {
        let mut store = MemoryStore::with_day_state(DayState {
            day_ended: true,
            last_recorded_day: Some(date(28)),
            running_since: None,
        });
        store
            .insert(&Session::manual(at(28, 9, 0, 0), at(28, 17, 0, 0)).unwrap())
            .unwrap();

        let (ts, _clock) = open_at(store, at(29, 8, 0, 0));
        assert_eq!(ts.state(), TimerState::Idle);
        assert_eq!(ts.today_total(), TimeDelta::zero());
        assert_eq!(ts.total_for_date(date(28)), TimeDelta::hours(8));
        assert!(ts.has_activity_on(date(28)));
        assert_eq!(ts.store().day_state().last_recorded_day, Some(date(29)));
        assert!(!ts.store().day_state().day_ended);
    }

    #[test]
    fn day_ended_today_survives_reopen() {
        let (mut ts, clock) = open_at(MemoryStore::new(), at(29, 9, 0, 0));
        ts.end_day().unwrap();
        let store = ts.into_store();

        let reopened = Timesheet::open(store, clock, Utc).unwrap();
        assert_eq!(reopened.state(), TimerState::DayEnded);
    }

    #[test]
    fn tick_across_midnight_clears_day_ended() {
        let (mut ts, clock) = open_at(MemoryStore::new(), at(29, 23, 59, 0));
        ts.end_day().unwrap();
        clock.advance(TimeDelta::minutes(2));
        assert_eq!(ts.tick().unwrap(), None);
        assert_eq!(ts.state(), TimerState::Idle);
    }

    #[test]
    fn running_timer_survives_reopen() {
        let (mut ts, clock) = open_at(MemoryStore::new(), at(29, 9, 0, 0));
        ts.start().unwrap();
        let store = ts.into_store();

        clock.advance(TimeDelta::minutes(20));
        let mut reopened = Timesheet::open(store, clock, Utc).unwrap();
        assert_eq!(reopened.elapsed(), TimeDelta::minutes(20));
        assert!(reopened.running_session().is_some());

        let session = reopened.stop().unwrap().applied().unwrap();
        assert_eq!(session.start_time(), at(29, 9, 0, 0));
        assert_eq!(session.duration(), Some(TimeDelta::minutes(20)));
    }

    #[test]
    fn manual_session_counts_towards_its_day() {
        let (mut ts, _clock) = open_at(MemoryStore::new(), at(29, 12, 0, 0));
        let session = ts.add_manual_session(at(29, 8, 0, 0), at(29, 9, 30, 0)).unwrap();
        assert_eq!(session.duration(), Some(TimeDelta::seconds(5400)));
        assert!(session.is_manual_entry());
        assert_eq!(ts.total_for_date(date(29)), TimeDelta::seconds(5400));
        assert_eq!(ts.today_sessions(), vec![session]);
    }

    #[test]
    fn invalid_manual_range_never_reaches_storage() {
        let (mut ts, _clock) = open_at(MemoryStore::new(), at(29, 12, 0, 0));
        let err = ts.add_manual_session(at(29, 9, 0, 0), at(29, 8, 0, 0)).unwrap_err();
        assert!(matches!(err, TimesheetError::InvalidRange(_)));
        assert!(ts.store().sessions().is_empty());
        assert!(ts.sessions().is_empty());
    }

    #[test]
    fn update_recomputes_duration_and_reorders() {
        let (mut ts, _clock) = open_at(MemoryStore::new(), at(29, 12, 0, 0));
        let early = ts.add_manual_session(at(29, 8, 0, 0), at(29, 9, 0, 0)).unwrap();
        let late = ts.add_manual_session(at(29, 10, 0, 0), at(29, 11, 0, 0)).unwrap();
        assert_eq!(ts.sessions()[0].id(), late.id());

        let moved = ts
            .update_session(early.id(), at(29, 10, 30, 0), at(29, 11, 45, 0))
            .unwrap();
        assert_eq!(moved.duration(), Some(TimeDelta::minutes(75)));
        assert_eq!(ts.sessions()[0].id(), early.id());
        assert_eq!(ts.store().fetch_all().unwrap()[0], moved);

        let err = ts
            .update_session(late.id(), at(29, 11, 0, 0), at(29, 10, 0, 0))
            .unwrap_err();
        assert!(matches!(err, TimesheetError::InvalidRange(_)));
    }

    #[test]
    fn delete_removes_session_and_unknown_ids_fail() {
        let (mut ts, _clock) = open_at(MemoryStore::new(), at(29, 12, 0, 0));
        let session = ts.add_manual_session(at(29, 8, 0, 0), at(29, 9, 0, 0)).unwrap();

        let removed = ts.delete_session(session.id()).unwrap();
        assert_eq!(removed, session);
        assert!(ts.sessions().is_empty());
        assert!(ts.store().sessions().is_empty());

        let err = ts.delete_session(session.id()).unwrap_err();
        assert!(matches!(err, TimesheetError::UnknownSession(id) if id == session.id()));
    }

    #[test]
    fn failed_write_keeps_cache_consistent() {
        let (mut ts, _clock) = open_at(MemoryStore::new(), at(29, 12, 0, 0));
        let session = ts.add_manual_session(at(29, 8, 0, 0), at(29, 9, 0, 0)).unwrap();

        let mut store = ts.into_store();
        store.set_fail_writes(true);
        let mut ts = Timesheet::open(store, ManualClock::new(at(29, 12, 0, 0)), Utc).unwrap();

        assert!(matches!(
            ts.add_manual_session(at(29, 10, 0, 0), at(29, 11, 0, 0)),
            Err(TimesheetError::Persistence(_))
        ));
        assert!(ts.update_session(session.id(), at(29, 7, 0, 0), at(29, 9, 0, 0)).is_err());
        assert!(ts.delete_session(session.id()).is_err());
        assert!(ts.start().is_err());

        assert_eq!(ts.sessions(), std::slice::from_ref(&session));
        assert_eq!(ts.state(), TimerState::Idle);
    }

    #[test]
    fn failed_stop_keeps_session_for_retry() {
        let (mut ts, clock) = open_at(MemoryStore::new(), at(29, 9, 0, 0));
        ts.start().unwrap();
        clock.advance(TimeDelta::minutes(10));

        let mut store = ts.into_store();
        store.set_fail_writes(true);
        let mut ts = Timesheet::open(store, clock.clone(), Utc).unwrap();
        assert!(ts.is_running());

        assert!(matches!(ts.stop(), Err(TimesheetError::Persistence(_))));
        assert_eq!(ts.state(), TimerState::Idle);
        assert_eq!(ts.pending().len(), 1);
        assert!(ts.sessions().is_empty());
        assert_eq!(ts.store().day_state().running_since, Some(at(29, 9, 0, 0)));

        let mut store = ts.into_store();
        store.set_fail_writes(false);
        // A fresh process recovers the interval from the running marker.
        let recovered = Timesheet::open(store, clock, Utc).unwrap();
        assert_eq!(recovered.elapsed(), TimeDelta::minutes(10));
    }

    #[test]
    fn stop_with_read_only_day_state_saves_nothing() {
        let (mut ts, clock) = open_at(MemoryStore::new(), at(29, 9, 0, 0));
        ts.start().unwrap();
        clock.advance(TimeDelta::minutes(30));

        ts.store.set_fail_day_state_writes(true);
        assert!(matches!(ts.stop(), Err(TimesheetError::Persistence(_))));
        assert!(ts.store().sessions().is_empty());
        assert_eq!(ts.store().day_state().running_since, Some(at(29, 9, 0, 0)));

        // The next process stops the recovered timer once, with the later end.
        let mut store = ts.into_store();
        store.set_fail_day_state_writes(false);
        clock.advance(TimeDelta::minutes(5));
        let mut reopened = Timesheet::open(store, clock, Utc).unwrap();
        assert_eq!(reopened.state(), TimerState::Running { since: at(29, 9, 0, 0) });
        let session = reopened.stop().unwrap().applied().unwrap();
        assert_eq!(session.duration(), Some(TimeDelta::minutes(35)));
        assert_eq!(reopened.store().sessions(), std::slice::from_ref(&session));
        assert_eq!(reopened.today_total(), TimeDelta::minutes(35));
    }

    #[test]
    fn marker_for_saved_session_is_not_restored() {
        let session = Session::from_timer(at(29, 9, 0, 0), at(29, 9, 30, 0));
        let mut store = MemoryStore::with_day_state(DayState {
            day_ended: false,
            last_recorded_day: Some(date(29)),
            running_since: Some(at(29, 9, 0, 0)),
        });
        store.insert(&session).unwrap();

        let (mut ts, _clock) = open_at(store, at(29, 9, 35, 0));
        assert_eq!(ts.state(), TimerState::Idle);
        assert_eq!(ts.store().day_state().running_since, None);
        assert!(!ts.stop().unwrap().is_applied());
        assert_eq!(ts.today_total(), TimeDelta::minutes(30));
    }

    #[test]
    fn start_after_midnight_clears_day_ended_without_tick() {
        let (mut ts, clock) = open_at(MemoryStore::new(), at(29, 23, 59, 0));
        ts.end_day().unwrap();
        clock.advance(TimeDelta::minutes(2));

        assert_eq!(ts.today(), date(30));
        assert!(ts.start().unwrap().is_applied());
        assert!(!ts.store().day_state().day_ended);
        assert_eq!(ts.store().day_state().last_recorded_day, Some(date(30)));
    }

    #[test]
    fn resume_after_midnight_is_ignored_because_day_already_reset() {
        let (mut ts, clock) = open_at(MemoryStore::new(), at(29, 23, 0, 0));
        ts.end_day().unwrap();
        clock.advance(TimeDelta::hours(2));

        assert!(!ts.resume_day().unwrap().is_applied());
        assert_eq!(ts.state(), TimerState::Idle);
        assert!(ts.add_manual_session(at(30, 0, 10, 0), at(30, 0, 40, 0)).is_ok());
        assert_eq!(ts.today_total(), TimeDelta::minutes(30));
    }

    #[test]
    fn retry_pending_saves_parked_sessions() {
        let clock = ManualClock::new(at(29, 9, 0, 0));
        let mut ts = Timesheet::open(MemoryStore::new(), clock.clone(), Utc).unwrap();
        ts.start().unwrap();
        clock.advance(TimeDelta::minutes(10));
        ts.store.set_fail_writes(true);
        assert!(ts.stop().is_err());

        assert!(ts.retry_pending().is_err());
        assert_eq!(ts.pending().len(), 1);

        ts.store.set_fail_writes(false);
        assert_eq!(ts.retry_pending().unwrap(), 1);
        assert!(ts.pending().is_empty());
        assert_eq!(ts.sessions().len(), 1);
        assert_eq!(ts.sessions()[0].duration(), Some(TimeDelta::minutes(10)));
        assert_eq!(ts.store().day_state().running_since, None);
    }

    #[test]
    fn history_filters_by_window() {
        let (mut ts, _clock) = open_at(MemoryStore::new(), at(29, 12, 0, 0));
        let today = ts.add_manual_session(at(29, 8, 0, 0), at(29, 9, 0, 0)).unwrap();
        let this_week = ts.add_manual_session(at(24, 8, 0, 0), at(24, 9, 0, 0)).unwrap();
        let older = ts.add_manual_session(at(10, 8, 0, 0), at(10, 9, 0, 0)).unwrap();

        assert_eq!(ts.history(HistoryFilter::Today), vec![today.clone()]);
        assert_eq!(ts.history(HistoryFilter::Week), vec![today.clone(), this_week.clone()]);
        assert_eq!(ts.history(HistoryFilter::All), vec![today, this_week, older]);
    }

    #[test]
    fn reload_picks_up_external_writes() {
        let (mut ts, _clock) = open_at(MemoryStore::new(), at(29, 12, 0, 0));
        let session = Session::manual(at(29, 8, 0, 0), at(29, 9, 0, 0)).unwrap();
        ts.store.insert(&session).unwrap();
        assert!(ts.sessions().is_empty());

        ts.reload().unwrap();
        assert_eq!(ts.sessions(), std::slice::from_ref(&session));
    }
}
