//! Core domain logic for the pulse work timer.
//!
//! This crate contains the fundamental types and logic for:
//! - Sessions: the tracked spans of work and their storage contract
//! - Timer: the idle / running / day-ended state machine
//! - Aggregation: daily totals, averages and breaks
//! - Export: report rows and CSV rendering

pub mod aggregate;
pub mod calendar;
mod clock;
pub mod duration;
pub mod export;
mod memory;
pub mod session;
pub mod store;
pub mod timer;
mod timesheet;

pub use aggregate::DaySummary;
pub use calendar::HistoryFilter;
pub use clock::{Clock, ManualClock, SystemClock};
pub use export::{ExportScope, Report, ReportRow, build_report, render_csv};
pub use memory::MemoryStore;
pub use session::{InvalidRange, Session, SessionId, SessionKind};
pub use store::{DayState, DayStateStore, PersistenceError, SessionRepository};
pub use timer::{InvalidTransition, Outcome, Timer, TimerCommand, TimerState};
pub use timesheet::{Timesheet, TimesheetError};
