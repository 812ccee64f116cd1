//! Tokio driver for the [`Reconciler`].
//!
//! [`AutoSave`] spawns a single task that owns the reconciler. All events
//! reach it through one channel, so transitions are applied strictly one at
//! a time even on a multi-threaded runtime.

use std::collections::HashMap;
use std::future;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant};

use crate::config::AutoSaveConfig;
use crate::error::{AutoSaveError, BoxError, Result, SaveFailure};
use crate::persist::Persister;
use crate::reconciler::{AttemptId, Effect, Reconciler, TimerToken, WaiterId};
use crate::snapshot::Snapshot;
use crate::status::SaveStatus;

type Outcome = std::result::Result<(), SaveFailure>;
type Reply = oneshot::Sender<Outcome>;

enum Command<T> {
    Update(Snapshot<T>),
    SaveNow(Reply),
    SetEnabled(bool),
    Status(oneshot::Sender<SaveStatus>),
    Dispose,
}

/// Handle to a running auto-save session.
///
/// Dropping the handle tears the session down, same as [`AutoSave::dispose`]
/// without waiting.
#[derive(Debug)]
pub struct AutoSave<T> {
    commands: mpsc::UnboundedSender<Command<T>>,
    status: watch::Receiver<SaveStatus>,
    task: Option<JoinHandle<()>>,
}

impl<T> AutoSave<T>
where
    T: Serialize + Clone + Send + 'static,
{
    /// Start auto-saving. `initial` becomes the baseline without being saved.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<P>(initial: T, persister: P, config: AutoSaveConfig) -> Result<Self>
    where
        P: Persister<T>,
    {
        let reconciler = Reconciler::new(Snapshot::capture(initial)?, config);
        let (status_tx, status_rx) = watch::channel(reconciler.status());
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let worker = Worker {
            reconciler,
            persister: Arc::new(persister),
            commands: commands_rx,
            status: status_tx,
            timer: None,
            in_flight: None,
            waiters: HashMap::new(),
        };
        let task = tokio::spawn(worker.run());

        Ok(Self {
            commands: commands_tx,
            status: status_rx,
            task: Some(task),
        })
    }

    /// Report the caller's current data.
    pub fn update(&self, data: T) -> Result<()> {
        let snapshot = Snapshot::capture(data)?;
        self.send(Command::Update(snapshot))
    }

    /// Persist now, skipping the debounce period.
    ///
    /// Resolves once the data current at the time of the call (or newer) is
    /// stored, or with the failure of the attempt that tried.
    pub async fn save_now(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::SaveNow(reply_tx))?;
        match reply_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(failure)) => Err(AutoSaveError::Persist(failure)),
            Err(_) => Err(AutoSaveError::Disposed),
        }
    }

    /// Turn automatic saving on or off. Manual saves keep working.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.send(Command::SetEnabled(enabled))
    }

    /// The latest published status.
    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    /// The status after every earlier call on this handle has been applied.
    ///
    /// [`AutoSave::status`] may lag behind an `update` that was just sent;
    /// this waits for the driver to catch up.
    pub async fn sync_status(&self) -> Result<SaveStatus> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Status(reply_tx))?;
        reply_rx.await.map_err(|_| AutoSaveError::Disposed)
    }

    /// Watch status changes.
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// Tear the session down and wait for the driver task to stop.
    ///
    /// A persist that is in flight keeps running, but its outcome is
    /// discarded and the status is never published again.
    pub async fn dispose(mut self) {
        let _ = self.commands.send(Command::Dispose);
        if let Some(task) = self.task.take()
            && let Err(error) = task.await
        {
            tracing::error!(%error, "Auto-save: driver task failed");
        }
    }

    fn send(&self, command: Command<T>) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| AutoSaveError::Disposed)
    }
}

impl<T> Drop for AutoSave<T> {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Dispose);
    }
}

#[derive(Debug, Clone, Copy)]
struct ArmedTimer {
    token: TimerToken,
    deadline: Instant,
}

struct InFlightTask {
    attempt: AttemptId,
    handle: JoinHandle<std::result::Result<(), BoxError>>,
}

enum Event<T> {
    Command(Command<T>),
    Closed,
    TimerFired(TimerToken),
    Settled {
        attempt: AttemptId,
        outcome: Outcome,
    },
}

struct Worker<T, P> {
    reconciler: Reconciler<T>,
    persister: Arc<P>,
    commands: mpsc::UnboundedReceiver<Command<T>>,
    status: watch::Sender<SaveStatus>,
    timer: Option<ArmedTimer>,
    in_flight: Option<InFlightTask>,
    waiters: HashMap<WaiterId, Reply>,
}

impl<T, P> Worker<T, P>
where
    T: Serialize + Clone + Send + 'static,
    P: Persister<T>,
{
    async fn run(mut self) {
        loop {
            let event = next_event(&mut self.commands, self.timer, &mut self.in_flight).await;
            let now = Instant::now().into_std();

            let effects = match event {
                Event::Command(Command::Update(snapshot)) => self.reconciler.observe(snapshot, now),
                Event::Command(Command::SaveNow(reply)) => {
                    let (waiter, effects) = self.reconciler.save_now();
                    self.waiters.insert(waiter, reply);
                    effects
                }
                Event::Command(Command::SetEnabled(enabled)) => {
                    self.reconciler.set_enabled(enabled, now)
                }
                Event::Command(Command::Status(reply)) => {
                    let _ = reply.send(self.reconciler.status());
                    Vec::new()
                }
                Event::Command(Command::Dispose) | Event::Closed => {
                    let effects = self.reconciler.teardown();
                    let _ = self.apply(effects);
                    break;
                }
                Event::TimerFired(token) => {
                    self.timer = None;
                    self.reconciler.timer_fired(token)
                }
                Event::Settled { attempt, outcome } => {
                    self.in_flight = None;
                    self.reconciler
                        .persist_settled(attempt, outcome, Utc::now(), now)
                }
            };

            // Waiters wake up to the status that includes their outcome.
            let replies = self.apply(effects);
            self.publish();
            for (reply, outcome) in replies {
                let _ = reply.send(outcome);
            }
        }

        // Pending manual saves observe the dropped reply as `Disposed`.
        self.waiters.clear();
        if self.in_flight.take().is_some() {
            tracing::debug!("Auto-save: detached in-flight save");
        }
    }

    /// Carry out effects. Manual save replies are returned, not sent.
    #[must_use]
    fn apply(&mut self, effects: Vec<Effect<T>>) -> Vec<(Reply, Outcome)> {
        let mut replies = Vec::new();
        for effect in effects {
            match effect {
                Effect::ArmTimer { token, delay } => {
                    self.timer = Some(ArmedTimer {
                        token,
                        deadline: Instant::now() + delay,
                    });
                }
                Effect::CancelTimer => self.timer = None,
                Effect::Persist { attempt, data } => {
                    let persister = Arc::clone(&self.persister);
                    let handle = tokio::spawn(async move { persister.persist(data).await });
                    self.in_flight = Some(InFlightTask { attempt, handle });
                }
                Effect::Resolve { waiters, outcome } => {
                    for waiter in waiters {
                        if let Some(reply) = self.waiters.remove(&waiter) {
                            replies.push((reply, outcome.clone()));
                        }
                    }
                }
            }
        }
        replies
    }

    fn publish(&self) {
        let status = self.reconciler.status();
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                tracing::trace!(state = status.state().name(), "Auto-save: status changed");
                *current = status;
                true
            }
        });
    }
}

async fn next_event<T>(
    commands: &mut mpsc::UnboundedReceiver<Command<T>>,
    timer: Option<ArmedTimer>,
    in_flight: &mut Option<InFlightTask>,
) -> Event<T> {
    let timer_fired = async {
        match timer {
            Some(armed) => {
                time::sleep_until(armed.deadline).await;
                armed.token
            }
            None => future::pending().await,
        }
    };
    let settled = async {
        match in_flight.as_mut() {
            Some(task) => {
                let joined = (&mut task.handle).await;
                (task.attempt, joined)
            }
            None => future::pending().await,
        }
    };

    tokio::select! {
        biased;

        command = commands.recv() => match command {
            Some(command) => Event::Command(command),
            None => Event::Closed,
        },
        (attempt, joined) = settled => Event::Settled {
            attempt,
            outcome: flatten_outcome(joined),
        },
        token = timer_fired => Event::TimerFired(token),
    }
}

fn flatten_outcome(
    joined: std::result::Result<std::result::Result<(), BoxError>, JoinError>,
) -> Outcome {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => Err(SaveFailure::from(error)),
        Err(join_error) => Err(SaveFailure::new(join_error)),
    }
}
