//! Persistence contracts the core reads and writes through.
//!
//! Backends live outside this crate (`pulse-db` for SQLite) apart from the
//! in-memory [`MemoryStore`](crate::MemoryStore).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::{Session, SessionId};

/// Boxed error from a storage backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A failed read or write against a backend.
///
/// Always recoverable: callers report it and keep running.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The session does not exist in storage.
    #[error("session {0} not found")]
    NotFound(SessionId),
    /// The backend failed.
    #[error("storage failure: {0}")]
    Storage(#[source] BoxError),
}

impl PersistenceError {
    pub fn storage(err: impl Into<BoxError>) -> Self {
        Self::Storage(err.into())
    }
}

/// Session storage.
///
/// Listings are sorted by start time, most recent first.
pub trait SessionRepository {
    fn insert(&mut self, session: &Session) -> Result<(), PersistenceError>;

    /// Replaces the stored session with the same ID.
    fn update(&mut self, session: &Session) -> Result<(), PersistenceError>;

    fn delete(&mut self, id: SessionId) -> Result<(), PersistenceError>;

    fn fetch_all(&self) -> Result<Vec<Session>, PersistenceError>;

    /// Sessions starting within the half-open range `[start, end)`.
    fn fetch_by_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Session>, PersistenceError>;
}

/// Durable per-day timer state, kept apart from sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayState {
    /// The user ended the work day recorded in `last_recorded_day`.
    pub day_ended: bool,
    /// Local calendar day the state was last reconciled against.
    pub last_recorded_day: Option<NaiveDate>,
    /// Start of the running timer, if any.
    pub running_since: Option<DateTime<Utc>>,
}

/// Storage for [`DayState`].
pub trait DayStateStore {
    /// Loads the state, returning the default when nothing was saved yet.
    fn load_day_state(&self) -> Result<DayState, PersistenceError>;

    fn save_day_state(&mut self, state: &DayState) -> Result<(), PersistenceError>;

    /// Saves a finished timer session together with the day state that no
    /// longer marks it running.
    ///
    /// Both writes land or neither does.
    fn record_stop(&mut self, session: &Session, state: &DayState)
    -> Result<(), PersistenceError>;
}

/// Sorts sessions most recent first, breaking ties by ID for a stable order.
pub fn sort_newest_first(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| {
        b.start_time()
            .cmp(&a.start_time())
            .then_with(|| a.id().cmp(&b.id()))
    });
}
