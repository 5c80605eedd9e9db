//! Pulse CLI library.
//!
//! This crate provides the CLI interface for the pulse work timer.

pub mod actor;
mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, ExportFormat, HistoryWindow};
pub use config::Config;
