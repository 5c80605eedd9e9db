//! Single-owner timer task.
//!
//! [`spawn`] moves a [`Timesheet`] into a tokio task. Commands arrive over an
//! `mpsc` channel and are answered on a `oneshot`; after every command or
//! tick the task publishes a [`Snapshot`] on a `watch` channel.
//!
//! The 1 Hz ticker exists only while the timer is running. It is created and
//! dropped in the same loop iteration that handles the command changing the
//! state, so no tick is ever processed after a stop or end-of-day.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use pulse_core::{
    Clock, DayStateStore, Outcome, Session, SessionRepository, TimerState, Timesheet,
    TimesheetError,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

const TICK_PERIOD: Duration = Duration::from_secs(1);
const CHANNEL_CAPACITY: usize = 16;

/// Errors returned by [`TimerHandle`] calls.
#[derive(Debug, Error)]
pub enum ActorError {
    #[error("timer task has shut down")]
    Closed,
    #[error(transparent)]
    Timesheet(#[from] TimesheetError),
}

/// What observers see of the timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub state: TimerState,
    pub elapsed: TimeDelta,
    pub today: NaiveDate,
    pub today_total: TimeDelta,
    pub pending: usize,
}

impl Snapshot {
    fn of<S, C, Tz>(timesheet: &Timesheet<S, C, Tz>) -> Self
    where
        S: SessionRepository + DayStateStore,
        C: Clock,
        Tz: TimeZone,
    {
        Self {
            state: timesheet.state(),
            elapsed: timesheet.elapsed(),
            today: timesheet.today(),
            today_total: timesheet.today_total(),
            pending: timesheet.pending().len(),
        }
    }
}

type Reply<T> = oneshot::Sender<Result<T, TimesheetError>>;

enum Request {
    Start(Reply<Outcome<DateTime<Utc>>>),
    Stop(Reply<Outcome<Session>>),
    EndDay(Reply<Outcome<Option<Session>>>),
    ResumeDay(Reply<Outcome<()>>),
    RetryPending(Reply<usize>),
}

/// Cloneable handle to a running timer task.
///
/// The task exits once every handle is dropped.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    requests: mpsc::Sender<Request>,
    snapshots: watch::Receiver<Snapshot>,
}

impl TimerHandle {
    pub async fn start(&self) -> Result<Outcome<DateTime<Utc>>, ActorError> {
        self.call(Request::Start).await
    }

    pub async fn stop(&self) -> Result<Outcome<Session>, ActorError> {
        self.call(Request::Stop).await
    }

    pub async fn end_day(&self) -> Result<Outcome<Option<Session>>, ActorError> {
        self.call(Request::EndDay).await
    }

    pub async fn resume_day(&self) -> Result<Outcome<()>, ActorError> {
        self.call(Request::ResumeDay).await
    }

    pub async fn retry_pending(&self) -> Result<usize, ActorError> {
        self.call(Request::RetryPending).await
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    async fn call<T>(&self, request: impl FnOnce(Reply<T>) -> Request) -> Result<T, ActorError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(request(reply))
            .await
            .map_err(|_| ActorError::Closed)?;
        Ok(response.await.map_err(|_| ActorError::Closed)??)
    }
}

/// Moves `timesheet` into a new task.
///
/// The join handle yields the timesheet back once every [`TimerHandle`] is
/// dropped.
pub fn spawn<S, C, Tz>(timesheet: Timesheet<S, C, Tz>) -> (TimerHandle, JoinHandle<Timesheet<S, C, Tz>>)
where
    S: SessionRepository + DayStateStore + Send + 'static,
    C: Clock + Send + 'static,
    Tz: TimeZone + Send + 'static,
{
    let (requests, receiver) = mpsc::channel(CHANNEL_CAPACITY);
    let (publisher, snapshots) = watch::channel(Snapshot::of(&timesheet));
    let task = tokio::spawn(run(timesheet, receiver, publisher));
    (
        TimerHandle {
            requests,
            snapshots,
        },
        task,
    )
}

async fn run<S, C, Tz>(
    mut timesheet: Timesheet<S, C, Tz>,
    mut requests: mpsc::Receiver<Request>,
    publisher: watch::Sender<Snapshot>,
) -> Timesheet<S, C, Tz>
where
    S: SessionRepository + DayStateStore,
    C: Clock,
    Tz: TimeZone,
{
    let mut ticker = timesheet.is_running().then(new_ticker);
    loop {
        tokio::select! {
            biased;
            request = requests.recv() => {
                let Some(request) = request else { break };
                handle(&mut timesheet, request);
                match (timesheet.is_running(), ticker.is_some()) {
                    (true, false) => ticker = Some(new_ticker()),
                    (false, true) => {
                        ticker = None;
                        debug!("ticker cancelled");
                    }
                    _ => {}
                }
            }
            () = next_tick(&mut ticker) => {
                if let Err(err) = timesheet.tick() {
                    warn!(error = %err, "tick failed");
                }
            }
        }
        publisher.send_replace(Snapshot::of(&timesheet));
    }
    debug!("timer task finished");
    timesheet
}

fn handle<S, C, Tz>(timesheet: &mut Timesheet<S, C, Tz>, request: Request)
where
    S: SessionRepository + DayStateStore,
    C: Clock,
    Tz: TimeZone,
{
    // A caller that gave up waiting is not an error.
    match request {
        Request::Start(reply) => drop(reply.send(timesheet.start())),
        Request::Stop(reply) => drop(reply.send(timesheet.stop())),
        Request::EndDay(reply) => drop(reply.send(timesheet.end_day())),
        Request::ResumeDay(reply) => drop(reply.send(timesheet.resume_day())),
        Request::RetryPending(reply) => drop(reply.send(timesheet.retry_pending())),
    }
}

fn new_ticker() -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!("ticker started");
    interval
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
