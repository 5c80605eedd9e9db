//! The work timer state machine.
//!
//! [`Timer`] is pure: it takes the current instant as an argument and never
//! touches storage. [`Timesheet`](crate::Timesheet) drives it and commits
//! each transition only after the matching write succeeds.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::session::Session;
use crate::store::DayState;

/// Where the timer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TimerState {
    Idle,
    Running { since: DateTime<Utc> },
    /// The work day was ended; starting is blocked until it is resumed.
    DayEnded,
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Running { .. } => "running",
            Self::DayEnded => "day ended",
        })
    }
}

/// A command the timer can refuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerCommand {
    Start,
    Stop,
    EndDay,
    ResumeDay,
}

impl fmt::Display for TimerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::EndDay => "end day",
            Self::ResumeDay => "resume day",
        })
    }
}

/// A command that does not apply in the current state.
///
/// Not an error: the command is skipped and reported through
/// [`Outcome::Ignored`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {command} while {state}")]
pub struct InvalidTransition {
    pub command: TimerCommand,
    pub state: TimerState,
}

/// Result of a timer command that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T> {
    Applied(T),
    Ignored(InvalidTransition),
}

impl<T> Outcome<T> {
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Ignored(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Applied(value) => Outcome::Applied(f(value)),
            Self::Ignored(rejected) => Outcome::Ignored(rejected),
        }
    }
}

/// Timer state plus the elapsed time shown while running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    state: TimerState,
    elapsed: TimeDelta,
}

impl Default for Timer {
    fn default() -> Self {
        Self {
            state: TimerState::Idle,
            elapsed: TimeDelta::zero(),
        }
    }
}

impl Timer {
    /// Restores the timer from persisted day state.
    ///
    /// A persisted running marker wins over the day-ended flag; the day is
    /// only ever ended after the timer has been stopped.
    pub fn from_day_state(day: &DayState, now: DateTime<Utc>) -> Self {
        let mut timer = Self::default();
        if let Some(since) = day.running_since {
            timer.state = TimerState::Running { since };
            timer.elapsed = elapsed_between(since, now);
        } else if day.day_ended {
            timer.state = TimerState::DayEnded;
        }
        timer
    }

    pub const fn state(&self) -> TimerState {
        self.state
    }

    /// Whole seconds since the timer started; zero when not running.
    pub const fn elapsed(&self) -> TimeDelta {
        self.elapsed
    }

    pub const fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running { .. })
    }

    pub const fn running_since(&self) -> Option<DateTime<Utc>> {
        match self.state {
            TimerState::Running { since } => Some(since),
            TimerState::Idle | TimerState::DayEnded => None,
        }
    }

    /// Idle to running.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), InvalidTransition> {
        if self.state != TimerState::Idle {
            return Err(self.reject(TimerCommand::Start));
        }
        self.state = TimerState::Running { since: now };
        self.elapsed = TimeDelta::zero();
        Ok(())
    }

    /// Refreshes the elapsed time from the wall clock.
    ///
    /// Elapsed time is `now - since` rather than a tick count, so missed or
    /// late ticks never accumulate drift. Returns `None` when not running.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<TimeDelta> {
        let since = self.running_since()?;
        self.elapsed = elapsed_between(since, now);
        Some(self.elapsed)
    }

    /// Running to idle, producing the completed session.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<Session, InvalidTransition> {
        let since = self
            .running_since()
            .ok_or_else(|| self.reject(TimerCommand::Stop))?;
        self.state = TimerState::Idle;
        self.elapsed = TimeDelta::zero();
        Ok(Session::from_timer(since, now))
    }

    /// Idle to day-ended. A running timer must be stopped first.
    pub fn end_day(&mut self) -> Result<(), InvalidTransition> {
        if self.state != TimerState::Idle {
            return Err(self.reject(TimerCommand::EndDay));
        }
        self.state = TimerState::DayEnded;
        Ok(())
    }

    /// Day-ended to idle.
    pub fn resume_day(&mut self) -> Result<(), InvalidTransition> {
        if self.state != TimerState::DayEnded {
            return Err(self.reject(TimerCommand::ResumeDay));
        }
        self.state = TimerState::Idle;
        Ok(())
    }

    /// Clears a day-ended state left over from a previous calendar day.
    ///
    /// Returns whether the state changed.
    pub fn roll_day(&mut self) -> bool {
        if self.state == TimerState::DayEnded {
            self.state = TimerState::Idle;
            return true;
        }
        false
    }

    const fn reject(&self, command: TimerCommand) -> InvalidTransition {
        InvalidTransition {
            command,
            state: self.state,
        }
    }
}

fn elapsed_between(since: DateTime<Utc>, now: DateTime<Utc>) -> TimeDelta {
    TimeDelta::seconds((now - since).num_seconds().max(0))
}
