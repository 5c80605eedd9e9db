//! Storage layer for the pulse work timer.
//!
//! Provides persistence for sessions and day state using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! This means a `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. The timer actor takes
//! ownership of one instance and serializes every access through its task.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with a fixed nine-digit
//! fraction and a `Z` suffix (e.g., `2025-01-29T09:00:00.000000000Z`).
//! This format ensures:
//! - Lexicographic ordering matches chronological ordering
//! - Values read back equal the values written, to the nanosecond
//! - Human-readable values in the database
//!
//! Calendar days (`last_recorded_day`) are stored as `YYYY-MM-DD`.
//!
//! ## Durations
//!
//! Session durations are not stored. They are always derived from
//! `start_time` and `end_time`, so an edit can never leave a stale duration.
//!
//! ## Day State
//!
//! `day_state` holds a single row (`id = 1`). A missing row reads as the
//! default state: day not ended, no recorded day, timer not running.

use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use pulse_core::{DayState, DayStateStore, PersistenceError, Session, SessionId, SessionRepository};
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;
use tracing::debug;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for session {session_id}: {timestamp}")]
    TimestampParse {
        session_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored session ID is not a UUID.
    #[error("invalid session id: {id}")]
    InvalidId {
        id: String,
        #[source]
        source: uuid::Error,
    },
    /// Failed to parse a stored calendar day.
    #[error("invalid recorded day: {value}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// No session with this ID exists.
    #[error("session {0} not found")]
    NotFound(SessionId),
}

impl From<DbError> for PersistenceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(id) => Self::NotFound(id),
            other => Self::storage(other),
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A session row as stored, before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionRow {
    id: String,
    start_time: String,
    end_time: Option<String>,
    is_manual: bool,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            start_time: row.get(1)?,
            end_time: row.get(2)?,
            is_manual: row.get(3)?,
        })
    }

    fn into_session(self) -> Result<Session, DbError> {
        let id = self
            .id
            .parse::<SessionId>()
            .map_err(|source| DbError::InvalidId {
                id: self.id.clone(),
                source,
            })?;
        let start = parse_timestamp(&self.start_time, &self.id)?;
        let end = self
            .end_time
            .as_deref()
            .map(|end| parse_timestamp(end, &self.id))
            .transpose()?;
        Ok(Session::restore(id, start, end, self.is_manual))
    }
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Sessions: one row per tracked span of work
            -- start_time / end_time: RFC 3339 UTC with nanoseconds
            -- end_time NULL: session still in progress
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                start_time TEXT NOT NULL,
                end_time TEXT,
                is_manual INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_start ON sessions(start_time);

            -- Day state: single row, independent of sessions
            CREATE TABLE IF NOT EXISTS day_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                day_ended INTEGER NOT NULL DEFAULT 0,
                last_recorded_day TEXT,
                running_since TEXT
            );
            ",
        )?;
        Ok(())
    }

    /// Inserts a session.
    pub fn insert_session(&mut self, session: &Session) -> Result<(), DbError> {
        insert_row(&self.conn, session)?;
        debug!(id = %session.id(), "inserted session");
        Ok(())
    }

    /// Replaces the times of an existing session.
    ///
    /// The manual flag is fixed at creation and is not rewritten.
    pub fn update_session(&mut self, session: &Session) -> Result<(), DbError> {
        let changed = self.conn.execute(
            "
            UPDATE sessions
            SET start_time = ?, end_time = ?, updated_at = ?
            WHERE id = ?
            ",
            params![
                format_timestamp(session.start_time()),
                session.end_time().map(format_timestamp),
                format_timestamp(Utc::now()),
                session.id().to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(DbError::NotFound(session.id()));
        }
        debug!(id = %session.id(), "updated session");
        Ok(())
    }

    /// Deletes a session by ID.
    pub fn delete_session(&mut self, id: SessionId) -> Result<(), DbError> {
        let changed = self
            .conn
            .execute("DELETE FROM sessions WHERE id = ?", [id.to_string()])?;
        if changed == 0 {
            return Err(DbError::NotFound(id));
        }
        debug!(%id, "deleted session");
        Ok(())
    }

    /// Lists all sessions, most recent start first.
    pub fn list_sessions(&self) -> Result<Vec<Session>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, start_time, end_time, is_manual
            FROM sessions
            ORDER BY start_time DESC, id ASC
            ",
        )?;
        let rows = stmt.query_map([], SessionRow::from_row)?;
        collect_sessions(rows)
    }

    /// Lists sessions starting within a time range, most recent first.
    ///
    /// The range is inclusive of `start` and exclusive of `end`.
    pub fn list_sessions_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Session>, DbError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT id, start_time, end_time, is_manual
            FROM sessions
            WHERE start_time >= ? AND start_time < ?
            ORDER BY start_time DESC, id ASC
            ",
        )?;
        let rows = stmt.query_map(
            [format_timestamp(start), format_timestamp(end)],
            SessionRow::from_row,
        )?;
        collect_sessions(rows)
    }

    /// Counts stored sessions.
    pub fn session_count(&self) -> Result<usize, DbError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Loads the day state, or the default if none was saved.
    pub fn load_day_state(&self) -> Result<DayState, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT day_ended, last_recorded_day, running_since FROM day_state WHERE id = 1",
                [],
                |row| {
                    let day_ended: bool = row.get(0)?;
                    let last_recorded_day: Option<String> = row.get(1)?;
                    let running_since: Option<String> = row.get(2)?;
                    Ok((day_ended, last_recorded_day, running_since))
                },
            )
            .optional()?;
        let Some((day_ended, last_recorded_day, running_since)) = row else {
            return Ok(DayState::default());
        };

        let last_recorded_day = last_recorded_day
            .map(|value| {
                NaiveDate::parse_from_str(&value, DAY_FORMAT)
                    .map_err(|source| DbError::InvalidDate { value, source })
            })
            .transpose()?;
        let running_since = running_since
            .map(|value| parse_timestamp(&value, "day_state"))
            .transpose()?;
        Ok(DayState {
            day_ended,
            last_recorded_day,
            running_since,
        })
    }

    /// Saves the day state, replacing any previous value.
    pub fn save_day_state(&mut self, state: &DayState) -> Result<(), DbError> {
        write_day_state(&self.conn, state)?;
        debug!(?state, "saved day state");
        Ok(())
    }

    /// Inserts a stopped session and saves the day state in one transaction.
    pub fn record_stop(&mut self, session: &Session, state: &DayState) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        insert_row(&tx, session)?;
        write_day_state(&tx, state)?;
        tx.commit()?;
        debug!(id = %session.id(), ?state, "recorded stopped session");
        Ok(())
    }
}

impl SessionRepository for Database {
    fn insert(&mut self, session: &Session) -> Result<(), PersistenceError> {
        Ok(self.insert_session(session)?)
    }

    fn update(&mut self, session: &Session) -> Result<(), PersistenceError> {
        Ok(self.update_session(session)?)
    }

    fn delete(&mut self, id: SessionId) -> Result<(), PersistenceError> {
        Ok(self.delete_session(id)?)
    }

    fn fetch_all(&self) -> Result<Vec<Session>, PersistenceError> {
        Ok(self.list_sessions()?)
    }

    fn fetch_by_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Session>, PersistenceError> {
        Ok(self.list_sessions_in_range(start, end)?)
    }
}

impl DayStateStore for Database {
    fn load_day_state(&self) -> Result<DayState, PersistenceError> {
        Ok(Self::load_day_state(self)?)
    }

    fn save_day_state(&mut self, state: &DayState) -> Result<(), PersistenceError> {
        Ok(Self::save_day_state(self, state)?)
    }

    fn record_stop(
        &mut self,
        session: &Session,
        state: &DayState,
    ) -> Result<(), PersistenceError> {
        Ok(Self::record_stop(self, session, state)?)
    }
}

fn insert_row(conn: &Connection, session: &Session) -> rusqlite::Result<()> {
    let now = format_timestamp(Utc::now());
    conn.execute(
        "
        INSERT INTO sessions (id, start_time, end_time, is_manual, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ",
        params![
            session.id().to_string(),
            format_timestamp(session.start_time()),
            session.end_time().map(format_timestamp),
            session.is_manual_entry(),
            now,
            now,
        ],
    )?;
    Ok(())
}

fn write_day_state(conn: &Connection, state: &DayState) -> rusqlite::Result<()> {
    conn.execute(
        "
        INSERT INTO day_state (id, day_ended, last_recorded_day, running_since)
        VALUES (1, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            day_ended = excluded.day_ended,
            last_recorded_day = excluded.last_recorded_day,
            running_since = excluded.running_since
        ",
        params![
            state.day_ended,
            state
                .last_recorded_day
                .map(|day| day.format(DAY_FORMAT).to_string()),
            state.running_since.map(format_timestamp),
        ],
    )?;
    Ok(())
}

fn collect_sessions(
    rows: impl Iterator<Item = rusqlite::Result<SessionRow>>,
) -> Result<Vec<Session>, DbError> {
    let mut sessions = Vec::new();
    for row in rows {
        sessions.push(row?.into_session()?);
    }
    Ok(sessions)
}

fn parse_timestamp(timestamp: &str, session_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            session_id: session_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}
