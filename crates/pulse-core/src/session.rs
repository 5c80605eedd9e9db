//! Work sessions: the record produced by the timer or by manual entry.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::duration::format_hms;

/// Number of ID characters shown to users.
pub const SHORT_ID_LEN: usize = 6;

/// Opaque, immutable session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Abbreviated form for listings.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..SHORT_ID_LEN].to_string()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// How a session was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    /// Recorded by the live timer.
    Automatic,
    /// Entered by the user with explicit start and end times.
    Manual,
}

impl SessionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Automatic => "Automatic",
            Self::Manual => "Manual",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A manual entry or edit whose end does not come after its start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("end time {end} must be after start time {start}")]
pub struct InvalidRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// One tracked span of work.
///
/// The duration is never stored; it is derived from the two timestamps, so
/// editing either one always yields a consistent duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    id: SessionId,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    is_manual_entry: bool,
}

impl Session {
    /// Builds the session recorded when the live timer stops.
    ///
    /// A clock that stepped backwards while running yields a zero-length
    /// session instead of a negative one.
    pub fn from_timer(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            start_time: start,
            end_time: Some(end.max(start)),
            is_manual_entry: false,
        }
    }

    /// Builds a manual entry, rejecting ranges where `end <= start`.
    pub fn manual(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InvalidRange> {
        check_range(start, end)?;
        Ok(Self {
            id: SessionId::new(),
            start_time: start,
            end_time: Some(end),
            is_manual_entry: true,
        })
    }

    /// An in-progress view of a running timer.
    pub fn in_progress(start: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            start_time: start,
            end_time: None,
            is_manual_entry: false,
        }
    }

    /// Rebuilds a session from storage without re-validating it.
    pub const fn restore(
        id: SessionId,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        is_manual_entry: bool,
    ) -> Self {
        Self {
            id,
            start_time,
            end_time,
            is_manual_entry,
        }
    }

    /// Returns an edited copy with new times; ID and entry kind are kept.
    pub fn with_times(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InvalidRange> {
        check_range(start, end)?;
        Ok(Self {
            start_time: start,
            end_time: Some(end),
            ..self.clone()
        })
    }

    pub const fn id(&self) -> SessionId {
        self.id
    }

    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub const fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub const fn is_manual_entry(&self) -> bool {
        self.is_manual_entry
    }

    pub const fn kind(&self) -> SessionKind {
        if self.is_manual_entry {
            SessionKind::Manual
        } else {
            SessionKind::Automatic
        }
    }

    pub const fn is_completed(&self) -> bool {
        self.end_time.is_some()
    }

    /// `end - start`, or `None` while in progress.
    pub fn duration(&self) -> Option<TimeDelta> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// Duration as `HH:MM:SS`; in-progress sessions show `00:00:00`.
    pub fn formatted_duration(&self) -> String {
        format_hms(self.duration().unwrap_or_default())
    }
}

fn check_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), InvalidRange> {
    if end <= start {
        return Err(InvalidRange { start, end });
    }
    Ok(())
}
