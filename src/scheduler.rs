//! Jittered periodic scheduler with pause/resume and residual-delay
//! preservation.

use futures::future::BoxFuture;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

type Handler = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Configuration for a [`Scheduler`]'s jittered delay: mean `interval` with
/// symmetric random jitter in `±[jitter_min, jitter_max)` of the base.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub jitter_min: f64,
    pub jitter_max: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(15), jitter_min: 0.10, jitter_max: 0.20 }
    }
}

impl SchedulerConfig {
    /// Computes one jittered delay: `base * (1 + sign * magnitude)`, floored
    /// at 1ms and rounded to the nearest integer millisecond.
    pub fn jittered_delay(&self) -> Duration {
        let base = self.interval.as_millis() as f64;
        let magnitude =
            self.jitter_min + (self.jitter_max - self.jitter_min) * rand::thread_rng().gen::<f64>();
        let sign: f64 = if rand::thread_rng().gen_bool(0.5) { 1.0 } else { -1.0 };
        let delay = (base * (1.0 + sign * magnitude)).max(1.0);
        Duration::from_millis(delay.round() as u64)
    }
}

enum Command {
    Start,
    Stop,
    Pause,
    Resume,
}

/// Emits tick events at a mean interval with per-tick jitter. Pausable with
/// residual-delay preservation. Handlers are invoked in registration order
/// on each tick and never block the scheduling of the next tick: a handler
/// panicking is caught and logged rather than stopping the scheduler.
#[derive(Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
    handlers: Arc<std::sync::Mutex<Vec<Handler>>>,
    command_tx: mpsc::UnboundedSender<Command>,
    task: Arc<std::sync::Mutex<Option<JoinHandle<()>>>>,
    tick_count: Arc<AtomicU64>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let handlers: Arc<std::sync::Mutex<Vec<Handler>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
        let tick_count = Arc::new(AtomicU64::new(0));
        let task = Arc::new(std::sync::Mutex::new(None));

        let scheduler = Self { config, handlers, command_tx, task, tick_count };
        scheduler.spawn_loop(command_rx);
        scheduler
    }

    fn spawn_loop(&self, mut command_rx: mpsc::UnboundedReceiver<Command>) {
        let config = self.config;
        let handlers = self.handlers.clone();
        let tick_count = self.tick_count.clone();

        let join = tokio::spawn(async move {
            #[derive(Clone, Copy)]
            enum State {
                Idle,
                Armed { fire_at: Instant },
                Paused { residual: Duration },
            }

            let mut state = State::Idle;

            loop {
                match state {
                    State::Idle => match command_rx.recv().await {
                        Some(Command::Start) | Some(Command::Resume) => {
                            state = State::Armed { fire_at: Instant::now() + config.jittered_delay() };
                        }
                        Some(Command::Stop) | Some(Command::Pause) => {}
                        None => break,
                    },
                    State::Armed { fire_at } => {
                        tokio::select! {
                            _ = tokio::time::sleep_until(fire_at) => {
                                tick_count.fetch_add(1, Ordering::SeqCst);
                                fire_handlers(&handlers);
                                state = State::Armed { fire_at: Instant::now() + config.jittered_delay() };
                            }
                            cmd = command_rx.recv() => {
                                match cmd {
                                    Some(Command::Stop) => state = State::Idle,
                                    Some(Command::Pause) => {
                                        let residual = fire_at.saturating_duration_since(Instant::now());
                                        state = State::Paused { residual };
                                    }
                                    Some(Command::Start) | Some(Command::Resume) => {}
                                    None => break,
                                }
                            }
                        }
                    }
                    State::Paused { residual } => match command_rx.recv().await {
                        Some(Command::Resume) => {
                            let delay = if residual.is_zero() { config.jittered_delay() } else { residual };
                            state = State::Armed { fire_at: Instant::now() + delay };
                        }
                        Some(Command::Start) => {
                            state = State::Armed { fire_at: Instant::now() + config.jittered_delay() };
                        }
                        Some(Command::Stop) => state = State::Idle,
                        Some(Command::Pause) => {}
                        None => break,
                    },
                }
            }
        });

        *self.task.lock().unwrap_or_else(|p| p.into_inner()) = Some(join);
    }

    /// Idempotent; arms the first delay immediately if not already running.
    pub fn start(&self) {
        let _ = self.command_tx.send(Command::Start);
    }

    /// Cancels the pending tick; no further ticks fire until [`Self::start`]
    /// or [`Self::resume`].
    pub fn stop(&self) {
        let _ = self.command_tx.send(Command::Stop);
    }

    /// Cancels the pending tick but records the residual delay for
    /// [`Self::resume`].
    pub fn pause(&self) {
        let _ = self.command_tx.send(Command::Pause);
    }

    /// Re-arms using the recorded residual delay, or a fresh jittered delay
    /// if none was recorded.
    pub fn resume(&self) {
        let _ = self.command_tx.send(Command::Resume);
    }

    /// Subscribes a handler; handlers run in registration order on each
    /// tick.
    pub fn on_tick<F>(&self, handler: F)
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.handlers.lock().unwrap_or_else(|p| p.into_inner()).push(Arc::new(handler));
    }

    /// Removes all registered handlers.
    pub fn clear_handlers(&self) {
        self.handlers.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }

    /// Number of ticks emitted so far (test/observability helper).
    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::SeqCst)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.lock().unwrap_or_else(|p| p.into_inner()).take() {
            task.abort();
        }
    }
}

/// Runs every registered handler for this tick, in registration order, on a
/// single spawned task so the caller (the scheduler loop) never blocks on
/// them. Each handler is itself wrapped in its own `tokio::spawn` so a panic
/// inside one is caught and logged without aborting the rest of the batch.
fn fire_handlers(handlers: &std::sync::Mutex<Vec<Handler>>) {
    let snapshot: Vec<Handler> = handlers.lock().unwrap_or_else(|p| p.into_inner()).clone();
    tokio::spawn(async move {
        for handler in snapshot {
            if let Err(join_err) = tokio::spawn(handler()).await {
                tracing::warn!(error = %join_err, "scheduler tick handler panicked");
            }
        }
    });
}
