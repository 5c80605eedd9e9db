use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use pulse_core::{ExportScope, SystemClock, Timesheet};
use pulse_db::Database;
use tracing_subscriber::EnvFilter;

use pulse_cli::commands::{calendar, export, history, sessions, status, timer, util, watch};
use pulse_cli::{Cli, Commands, Config};

type LocalTimesheet = Timesheet<Database, SystemClock, Local>;

/// Load config and open the timesheet, ensuring the database directory exists.
fn open_timesheet(config_path: Option<&Path>) -> Result<(LocalTimesheet, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = Database::open(&config.database_path).context("failed to open database")?;
    let timesheet = Timesheet::open(db, SystemClock, Local).context("failed to load timesheet")?;
    tracing::debug!(
        timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "local".to_string()),
        "opened timesheet"
    );
    Ok((timesheet, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut timesheet, config) = open_timesheet(cli.config.as_deref())?;
    let mut stdout = io::stdout().lock();

    match command {
        Commands::Start => timer::start(&mut timesheet, &mut stdout)?,
        Commands::Stop => timer::stop(&mut timesheet, &mut stdout)?,
        Commands::EndDay => timer::end_day(&mut timesheet, &mut stdout)?,
        Commands::ResumeDay => timer::resume_day(&mut timesheet, &mut stdout)?,
        Commands::Status { json } => {
            status::run(&timesheet, config.daily_goal(), json, &mut stdout)?;
        }
        Commands::Add { start, end } => {
            sessions::add(&mut timesheet, &start, &end, &mut stdout)?;
        }
        Commands::Edit { id, start, end } => {
            sessions::edit(
                &mut timesheet,
                &id,
                start.as_deref(),
                end.as_deref(),
                &mut stdout,
            )?;
        }
        Commands::Delete { id } => sessions::delete(&mut timesheet, &id, &mut stdout)?,
        Commands::History { window, json } => {
            history::run(&timesheet, window.filter(), json, &mut stdout)?;
        }
        Commands::Calendar { month, day } => match (month, day) {
            (_, Some(day)) => {
                let date = util::parse_date(&day, timesheet.today())?;
                calendar::day(&timesheet, date, &mut stdout)?;
            }
            (Some(month), None) => {
                calendar::month(&timesheet, util::parse_month(&month)?, &mut stdout)?;
            }
            (None, None) => calendar::month(&timesheet, timesheet.today(), &mut stdout)?,
        },
        Commands::Export {
            day,
            window,
            format,
            output,
        } => {
            let scope = match day {
                Some(day) => ExportScope::Day(util::parse_date(&day, timesheet.today())?),
                None => ExportScope::History(window.filter()),
            };
            export::run(&timesheet, scope, format, output.as_deref(), &mut stdout)?;
        }
        Commands::Watch => {
            drop(stdout);
            watch::run(timesheet, config.daily_goal())?;
            return Ok(());
        }
    }

    stdout.flush()?;
    Ok(())
}
