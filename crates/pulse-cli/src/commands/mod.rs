//! CLI subcommand implementations.

pub mod calendar;
pub mod export;
pub mod history;
pub mod sessions;
pub mod status;
pub mod timer;
pub mod util;
pub mod watch;
