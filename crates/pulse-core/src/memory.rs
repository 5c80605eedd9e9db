//! In-memory backend.

use std::io;

use chrono::{DateTime, Utc};

use crate::session::{Session, SessionId};
use crate::store::{
    DayState, DayStateStore, PersistenceError, SessionRepository, sort_newest_first,
};

/// Non-durable implementation of both storage traits.
///
/// Writes can be made to fail on demand, which lets callers exercise the
/// persistence-failure paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sessions: Vec<Session>,
    day_state: DayState,
    fail_writes: bool,
    fail_day_state_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from previously saved day state.
    pub fn with_day_state(day_state: DayState) -> Self {
        Self {
            day_state,
            ..Self::default()
        }
    }

    /// When set, every write fails with a storage error.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// When set, only day-state writes fail; session writes still succeed.
    pub fn set_fail_day_state_writes(&mut self, fail: bool) {
        self.fail_day_state_writes = fail;
    }

    /// Sessions currently stored, in insertion order.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub const fn day_state(&self) -> &DayState {
        &self.day_state
    }

    fn check_writable(&self) -> Result<(), PersistenceError> {
        if self.fail_writes {
            return Err(PersistenceError::storage(io::Error::other(
                "writes disabled",
            )));
        }
        Ok(())
    }

    fn check_day_state_writable(&self) -> Result<(), PersistenceError> {
        self.check_writable()?;
        if self.fail_day_state_writes {
            return Err(PersistenceError::storage(io::Error::other(
                "day state writes disabled",
            )));
        }
        Ok(())
    }

    fn position(&self, id: SessionId) -> Result<usize, PersistenceError> {
        self.sessions
            .iter()
            .position(|s| s.id() == id)
            .ok_or(PersistenceError::NotFound(id))
    }
}

impl SessionRepository for MemoryStore {
    fn insert(&mut self, session: &Session) -> Result<(), PersistenceError> {
        self.check_writable()?;
        self.sessions.push(session.clone());
        Ok(())
    }

    fn update(&mut self, session: &Session) -> Result<(), PersistenceError> {
        self.check_writable()?;
        let index = self.position(session.id())?;
        self.sessions[index] = session.clone();
        Ok(())
    }

    fn delete(&mut self, id: SessionId) -> Result<(), PersistenceError> {
        self.check_writable()?;
        let index = self.position(id)?;
        self.sessions.remove(index);
        Ok(())
    }

    fn fetch_all(&self) -> Result<Vec<Session>, PersistenceError> {
        let mut sessions = self.sessions.clone();
        sort_newest_first(&mut sessions);
        Ok(sessions)
    }

    fn fetch_by_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Session>, PersistenceError> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|s| s.start_time() >= start && s.start_time() < end)
            .cloned()
            .collect();
        sort_newest_first(&mut sessions);
        Ok(sessions)
    }
}

impl DayStateStore for MemoryStore {
    fn load_day_state(&self) -> Result<DayState, PersistenceError> {
        Ok(self.day_state.clone())
    }

    fn save_day_state(&mut self, state: &DayState) -> Result<(), PersistenceError> {
        self.check_day_state_writable()?;
        self.day_state = state.clone();
        Ok(())
    }

    fn record_stop(
        &mut self,
        session: &Session,
        state: &DayState,
    ) -> Result<(), PersistenceError> {
        self.check_day_state_writable()?;
        self.sessions.push(session.clone());
        self.day_state = state.clone();
        Ok(())
    }
}
