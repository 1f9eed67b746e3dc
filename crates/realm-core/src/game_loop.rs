//! `GameLoop`: drives a [`GameState`] on a fixed period.
//!
//! The loop runs on a tokio task. Each tick locks the state, runs the full
//! pass and releases the lock before anything is published, so a slow
//! subscriber never holds up the simulation. Results go out two ways:
//!
//! - a `watch` channel holding the latest [`WorldSnapshot`], for readers that
//!   only care about the current state;
//! - a `broadcast` channel of [`TickReport`]s, for consumers that need every
//!   reward, level-up and combat entry.
//!
//! Missed ticks are skipped rather than bunched up. A tick that takes longer
//! than the period is logged as an overrun.
//!
//! # Example
//!
//! ```
//! use realm_core::config::GameConfig;
//! use realm_core::game_loop::GameLoop;
//! use realm_core::game_state::GameState;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let state = GameState::new(GameConfig::default(), 1).unwrap();
//! let mut game = GameLoop::new(state);
//! let mut snapshots = game.snapshots();
//!
//! game.start();
//! snapshots.changed().await.unwrap();
//! assert!(snapshots.borrow().tick >= 1);
//! game.shutdown().await;
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::game_state::GameState;
use crate::snapshot::{TickReport, WorldSnapshot};

/// Reports buffered per subscriber before the slowest starts lagging.
const REPORT_BUFFER: usize = 256;

struct Running {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Fixed-rate scheduler for a [`GameState`].
pub struct GameLoop {
    state: Arc<Mutex<GameState>>,
    period: Duration,
    snapshots: watch::Sender<Arc<WorldSnapshot>>,
    reports: broadcast::Sender<Arc<TickReport>>,
    running: Option<Running>,
}

impl std::fmt::Debug for GameLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameLoop")
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl GameLoop {
    /// Wraps `state`, ticking at its configured period. Not started yet.
    #[must_use]
    pub fn new(state: GameState) -> Self {
        let period = state.config().tick.period();
        let (snapshots, _) = watch::channel(state.latest_snapshot());
        let (reports, _) = broadcast::channel(REPORT_BUFFER);
        Self {
            state: Arc::new(Mutex::new(state)),
            period,
            snapshots,
            reports,
            running: None,
        }
    }

    /// Tick period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Returns true while the loop task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|r| !r.handle.is_finished())
    }

    /// Latest snapshot, updated after every tick.
    #[must_use]
    pub fn snapshots(&self) -> watch::Receiver<Arc<WorldSnapshot>> {
        self.snapshots.subscribe()
    }

    /// Stream of per-tick reports.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<TickReport>> {
        self.reports.subscribe()
    }

    /// Run `f` against the state between ticks. Admin commands go through
    /// here so they never interleave with a tick pass.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut GameState) -> R) -> R {
        f(&mut lock(&self.state))
    }

    /// Start ticking. Does nothing if already running. Must be called from
    /// within a tokio runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let (stop, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run(
            Arc::clone(&self.state),
            self.period,
            self.snapshots.clone(),
            self.reports.clone(),
            stop_rx,
        ));
        self.running = Some(Running { stop, handle });
        tracing::info!(period = ?self.period, "game loop started");
    }

    /// Stop scheduling ticks. A tick already in progress completes. Does
    /// nothing if not running.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.stop.send_replace(true);
            tracing::info!("game loop stopping");
        }
    }

    /// Stop and wait for the loop task to finish.
    pub async fn shutdown(&mut self) {
        if let Some(running) = self.running.take() {
            running.stop.send_replace(true);
            if let Err(err) = running.handle.await {
                tracing::error!(%err, "game loop task failed");
            }
            tracing::info!("game loop stopped");
        }
    }
}

impl Drop for GameLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock(state: &Mutex<GameState>) -> MutexGuard<'_, GameState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run(
    state: Arc<Mutex<GameState>>,
    period: Duration,
    snapshots: watch::Sender<Arc<WorldSnapshot>>,
    reports: broadcast::Sender<Arc<TickReport>>,
    mut stop: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
                continue;
            }
            _ = interval.tick() => {}
        }

        let started = Instant::now();
        let report = lock(&state).step();
        let elapsed = started.elapsed();
        if elapsed > period {
            tracing::warn!(tick = report.tick(), ?elapsed, ?period, "tick overran its period");
        }

        snapshots.send_replace(Arc::clone(&report.snapshot));
        // No subscribers is fine.
        let _ = reports.send(Arc::new(report));
    }
}
