//! Watch command: a live timer display driven by the timer task.
//!
//! Reads one command per line from stdin (`start`, `stop`, `end`, `resume`,
//! `quit`) and redraws a status line whenever a new snapshot is published.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{TimeDelta, TimeZone};
use pulse_core::aggregate::goal_progress;
use pulse_core::duration::format_hms;
use pulse_core::{Clock, DayStateStore, Outcome, SessionRepository, TimerState, Timesheet};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::actor::{self, Snapshot, TimerHandle};

/// A line of input from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchCommand {
    Start,
    Stop,
    EndDay,
    ResumeDay,
    Retry,
    Quit,
}

impl WatchCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "start" | "s" => Some(Self::Start),
            "stop" | "x" => Some(Self::Stop),
            "end" | "end-day" => Some(Self::EndDay),
            "resume" | "resume-day" => Some(Self::ResumeDay),
            "retry" => Some(Self::Retry),
            "quit" | "q" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Runs the live display on stdin and stdout until `quit` or end of input.
pub fn run<S, C, Tz>(timesheet: Timesheet<S, C, Tz>, goal: TimeDelta) -> Result<()>
where
    S: SessionRepository + DayStateStore + Send + 'static,
    C: Clock + Send + 'static,
    Tz: TimeZone + Send + 'static,
{
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    runtime.block_on(async {
        let input = BufReader::new(tokio::io::stdin());
        let mut stdout = std::io::stdout();
        drive(timesheet, goal, input, &mut stdout).await
    })
}

/// Feeds `input` lines to the timer task and renders snapshots to `output`.
pub async fn drive<S, C, Tz, R, W>(
    timesheet: Timesheet<S, C, Tz>,
    goal: TimeDelta,
    input: R,
    output: &mut W,
) -> Result<()>
where
    S: SessionRepository + DayStateStore + Send + 'static,
    C: Clock + Send + 'static,
    Tz: TimeZone + Send + 'static,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let (handle, task) = actor::spawn(timesheet);
    let mut updates = handle.subscribe();
    let mut lines = input.lines();

    writeln!(output, "Commands: start, stop, end, resume, retry, quit")?;
    let initial = updates.borrow_and_update().clone();
    render(output, &initial, goal)?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read input")? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let Some(command) = WatchCommand::parse(&line) else {
                    writeln!(output, "Unknown command: {}", line.trim())?;
                    continue;
                };
                if command == WatchCommand::Quit {
                    break;
                }
                if let Err(err) = apply(&handle, command, output).await {
                    writeln!(output, "Error: {err:#}")?;
                }
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                render(output, &snapshot, goal)?;
            }
        }
    }

    drop(handle);
    let timesheet = task.await.context("timer task panicked")?;
    if timesheet.is_running() {
        writeln!(output, "Timer still running; stop it with `pulse stop`.")?;
    }
    Ok(())
}

async fn apply<W: Write>(handle: &TimerHandle, command: WatchCommand, output: &mut W) -> Result<()> {
    let notice = match command {
        WatchCommand::Start => describe(handle.start().await?.map(|_| "Timer started.".to_string())),
        WatchCommand::Stop => describe(
            handle
                .stop()
                .await?
                .map(|session| format!("Saved session ({}).", session.formatted_duration())),
        ),
        WatchCommand::EndDay => describe(handle.end_day().await?.map(|_| "Day ended.".to_string())),
        WatchCommand::ResumeDay => {
            describe(handle.resume_day().await?.map(|()| "Day resumed.".to_string()))
        }
        WatchCommand::Retry => format!("Saved {} pending session(s).", handle.retry_pending().await?),
        WatchCommand::Quit => return Ok(()),
    };
    writeln!(output, "{notice}")?;
    Ok(())
}

fn describe(outcome: Outcome<String>) -> String {
    match outcome {
        Outcome::Applied(message) => message,
        Outcome::Ignored(rejected) => format!("Nothing to do: {rejected}"),
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "percent is rounded from a fraction clamped to [0, 1]"
)]
fn render<W: Write>(output: &mut W, snapshot: &Snapshot, goal: TimeDelta) -> Result<()> {
    let percent = (goal_progress(snapshot.today_total, goal) * 100.0).round() as u32;
    let state = match snapshot.state {
        TimerState::Running { .. } => format!("running {}", format_hms(snapshot.elapsed)),
        TimerState::Idle => "idle".to_string(),
        TimerState::DayEnded => "day ended".to_string(),
    };
    let pending = if snapshot.pending > 0 {
        format!(" | {} unsaved", snapshot.pending)
    } else {
        String::new()
    };
    writeln!(
        output,
        "[{}] {state} | today {} ({percent}%){pending}",
        snapshot.today,
        format_hms(snapshot.today_total)
    )?;
    output.flush()?;
    Ok(())
}
