//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Default daily goal: an eight hour day.
pub const DEFAULT_DAILY_GOAL_MINUTES: u32 = 8 * 60;

/// A goal longer than a day can never be reached.
pub const MAX_DAILY_GOAL_MINUTES: u32 = 24 * 60;

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Daily work goal in minutes, used for progress in `pulse status`.
    pub daily_goal_minutes: u32,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("daily_goal_minutes", &self.daily_goal_minutes)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("pulse.db"),
            daily_goal_minutes: DEFAULT_DAILY_GOAL_MINUTES,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    ///
    /// Later layers win: defaults, `~/.config/pulse/config.toml`, the given
    /// file, then `PULSE_*` environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (PULSE_*)
        figment = figment.merge(Env::prefixed("PULSE_"));

        let config: Self = figment.extract()?;
        if !(1..=MAX_DAILY_GOAL_MINUTES).contains(&config.daily_goal_minutes) {
            return Err(figment::Error::from(format!(
                "daily_goal_minutes must be between 1 and {MAX_DAILY_GOAL_MINUTES}, got {}",
                config.daily_goal_minutes
            )));
        }
        Ok(config)
    }

    /// The daily goal as a duration.
    pub fn daily_goal(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.daily_goal_minutes))
    }
}

/// Returns the platform-specific config directory for pulse.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("pulse"))
}

/// Returns the platform-specific data directory for pulse.
///
/// On Linux: `~/.local/share/pulse`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("pulse"))
}
