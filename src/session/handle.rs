use super::state::{Direction, FocusSession, FocusState, SessionPhase, TimerOutcome};
use crate::domain::propagation::complete_all;
use crate::domain::Task;
use crate::notifications::{notify_break_over, notify_task_done};
use crate::persistence::AppConfig;
use crate::repository::TaskRepository;
use crate::ticker::{countdown_tick, timer_seconds};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Tunables for a session driver
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub break_minutes: i64,
    pub auto_start_delay: Duration,
    /// Wall-clock length of one countdown second
    pub tick: Duration,
    pub notifications: bool,
}

impl SessionOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            break_minutes: config.break_minutes,
            auto_start_delay: Duration::from_millis(config.auto_start_delay_ms),
            tick: countdown_tick(),
            notifications: config.notifications,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

struct Slot {
    session: Option<FocusSession>,
    generation: u64,
}

impl Slot {
    /// Drop the session and invalidate any countdown bound to it
    fn clear(&mut self) {
        self.session = None;
        self.generation += 1;
    }
}

struct Inner {
    repo: Arc<dyn TaskRepository>,
    runtime: Handle,
    options: SessionOptions,
    slot: Mutex<Slot>,
    state_tx: watch::Sender<FocusState>,
    countdown: Mutex<Option<JoinHandle<()>>>,
    auto_start: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cloneable handle to the focus session; at most one session is open
///
/// The pure `FocusSession` lives behind a mutex together with a generation
/// counter. An action that changes the running timer bumps the generation and
/// aborts the countdown task, so a countdown already past its sleep sees a
/// stale generation and exits without touching the session.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Inner>,
}

impl SessionHandle {
    pub fn new(repo: Arc<dyn TaskRepository>, runtime: Handle, options: SessionOptions) -> Self {
        let closed = closed_state(&options);
        let (state_tx, _) = watch::channel(closed);
        Self {
            inner: Arc::new(Inner {
                repo,
                runtime,
                options,
                slot: Mutex::new(Slot {
                    session: None,
                    generation: 0,
                }),
                state_tx,
                countdown: Mutex::new(None),
                auto_start: Mutex::new(None),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FocusState> {
        self.inner.state_tx.subscribe()
    }

    pub fn state(&self) -> FocusState {
        self.inner.state_tx.borrow().clone()
    }

    /// Bind a session to `task_id`, replacing any open one
    ///
    /// The timer starts on its own after the configured delay unless a user
    /// action comes first. Returns false when the task does not exist.
    pub fn open(&self, task_id: &str) -> bool {
        self.inner.cancel_auto_start();

        let Some(task) = self.inner.repo.get_task(task_id) else {
            warn!(task_id, "focus session requested for unknown task");
            self.close();
            return false;
        };

        let generation = {
            let mut slot = lock(&self.inner.slot);
            let session = FocusSession::open(&task, self.inner.options.break_minutes);
            info!(
                task_id,
                leaves = session.leaves().len(),
                index = session.state().subtask_index,
                "focus session opened"
            );
            self.inner.state_tx.send_replace(session.state().clone());
            slot.session = Some(session);
            slot.generation += 1;
            slot.generation
        };
        self.inner.abort_countdown();

        let inner = Arc::clone(&self.inner);
        let delay = self.inner.options.auto_start_delay;
        let auto_start = self.inner.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            inner.auto_start(generation);
        });
        *lock(&self.inner.auto_start) = Some(auto_start);
        true
    }

    pub fn toggle_timer(&self) {
        self.with_live_session(|session| {
            session.toggle_timer();
        });
    }

    pub fn pause_timer(&self) {
        self.with_live_session(FocusSession::pause);
    }

    pub fn reset_timer(&self) {
        self.with_live_session(FocusSession::reset);
    }

    pub fn toggle_break_mode(&self, minutes: Option<i64>) {
        self.with_live_session(|session| session.toggle_break_mode(minutes));
    }

    pub fn set_break_duration(&self, minutes: i64) {
        self.with_live_session(|session| session.set_break_duration(minutes));
    }

    pub fn navigate_leaf(&self, direction: Direction) {
        self.with_live_session(|session| {
            session.navigate(direction);
        });
    }

    /// Cancel every pending timer and reset to the closed state
    pub fn close(&self) {
        self.inner.cancel_auto_start();
        let mut slot = lock(&self.inner.slot);
        if slot.session.is_some() {
            debug!("focus session closed");
        }
        slot.clear();
        self.inner.abort_countdown();
        self.inner.state_tx.send_replace(closed_state(&self.inner.options));
    }

    /// Apply a user action to the open session
    ///
    /// The bound task is re-read first; when it is gone the session closes
    /// instead. A countdown in flight is only replaced when the action moved
    /// the timer; otherwise it keeps its place in the current second.
    fn with_live_session<F>(&self, op: F)
    where
        F: FnOnce(&mut FocusSession),
    {
        self.inner.cancel_auto_start();

        let mut slot = lock(&self.inner.slot);
        let Some(session) = slot.session.as_mut() else {
            return;
        };

        if self.inner.repo.get_task(session.task_id()).is_none() {
            warn!(task_id = session.task_id(), "bound task disappeared, closing session");
            slot.clear();
            self.inner.abort_countdown();
            self.inner.state_tx.send_replace(closed_state(&self.inner.options));
            return;
        }

        let before = timer_key(session.state());
        op(session);
        let running = session.is_running();
        let state = session.state().clone();

        if timer_key(&state) != before {
            slot.generation += 1;
            let generation = slot.generation;
            self.inner.abort_countdown();
            if running {
                self.inner.spawn_countdown(generation);
            }
        }
        self.inner.state_tx.send_replace(state);
    }
}

/// Timer fields a countdown in flight depends on
fn timer_key(state: &FocusState) -> (SessionPhase, u32, u32, usize) {
    (
        state.phase,
        state.remaining_seconds,
        state.total_seconds,
        state.subtask_index,
    )
}

/// A countdown that ran out, handled after the session lock is released
struct Expired {
    task_id: String,
    title: String,
    outcome: TimerOutcome,
}

impl Inner {
    fn cancel_auto_start(&self) {
        if let Some(handle) = lock(&self.auto_start).take() {
            handle.abort();
        }
    }

    fn abort_countdown(&self) {
        if let Some(handle) = lock(&self.countdown).take() {
            handle.abort();
        }
    }

    fn spawn_countdown(self: &Arc<Self>, generation: u64) {
        let inner = Arc::clone(self);
        let handle = self.runtime.spawn(inner.run_countdown(generation));
        if let Some(previous) = lock(&self.countdown).replace(handle) {
            previous.abort();
        }
    }

    fn auto_start(self: &Arc<Self>, generation: u64) {
        let mut slot = lock(&self.slot);
        if slot.generation != generation {
            return;
        }
        let Some(session) = slot.session.as_mut() else {
            return;
        };
        if session.start() {
            debug!(task_id = session.task_id(), "timer auto-started");
            self.state_tx.send_replace(session.state().clone());
            self.spawn_countdown(generation);
        }
    }

    async fn run_countdown(self: Arc<Self>, generation: u64) {
        loop {
            tokio::time::sleep(self.options.tick).await;

            let expired = {
                let mut slot = lock(&self.slot);
                if slot.generation != generation {
                    return;
                }
                let Some(session) = slot.session.as_mut() else {
                    return;
                };
                if !session.is_running() {
                    return;
                }

                let outcome = session.tick();
                self.state_tx.send_replace(session.state().clone());
                outcome.map(|outcome| Expired {
                    task_id: session.task_id().to_string(),
                    title: session.state().task_title.clone(),
                    outcome,
                })
            };

            if let Some(expired) = expired {
                // Repository I/O and notifications run without the slot lock
                let inner = Arc::clone(&self);
                let finished =
                    tokio::task::spawn_blocking(move || inner.finish_countdown(generation, expired));
                if let Err(err) = finished.await {
                    warn!(error = %err, "timer completion task failed");
                }
                return;
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        lock(&self.slot).generation == generation
    }

    /// Close the session unless a later action already replaced it
    fn close_if_current(&self, generation: u64) {
        let mut slot = lock(&self.slot);
        if slot.generation != generation {
            return;
        }
        slot.clear();
        self.abort_countdown();
        self.state_tx.send_replace(closed_state(&self.options));
    }

    fn finish_countdown(&self, generation: u64, expired: Expired) {
        let Expired {
            task_id,
            title,
            outcome,
        } = expired;

        let Some(task) = self.repo.get_task(&task_id) else {
            warn!(task_id = %task_id, "bound task disappeared, closing session");
            self.close_if_current(generation);
            return;
        };

        match outcome {
            TimerOutcome::BreakOver => {
                info!(task_id = %task_id, "break over");
                if self.options.notifications {
                    notify_break_over(&title);
                }
            }
            TimerOutcome::Advanced { index } => {
                info!(task_id = %task_id, index, "advanced to next subtask");
            }
            TimerOutcome::TaskFinished => {
                if !self.is_current(generation) {
                    debug!(task_id = %task_id, "session replaced before completion was saved");
                    return;
                }
                self.complete_task(task);
            }
        }
    }

    /// Mark the live task and its whole tree complete
    fn complete_task(&self, task: Task) {
        let now = Utc::now();
        let mut done = complete_all(&task);
        done.stamp_completion(task.completed, now);
        done.updated_at = now;

        match self.repo.upsert_task(done) {
            Ok(()) => info!(task_id = %task.id, "focus session completed task"),
            Err(err) => warn!(task_id = %task.id, error = %err, "failed to save completed task"),
        }
        if self.options.notifications {
            notify_task_done(&task.title);
        }
    }
}

fn closed_state(options: &SessionOptions) -> FocusState {
    FocusState {
        break_seconds: timer_seconds(options.break_minutes),
        ..FocusState::default()
    }
}
