//! Periodic tick scheduling for countdown sessions.
//!
//! Each running session owns one repeating tick stream, identified by its
//! [`SessionId`]. Ticks are not delivered to the timer directly: they are
//! sent as [`Wakeup`] messages to the daemon loop, which hands them to the
//! timer one at a time. Cancelling a stream aborts its task; a tick that was
//! already queued is still delivered and must be ignored by the timer.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::debug;

use crate::types::SessionId;

// ============================================================================
// Wakeup
// ============================================================================

/// A reason to recompute the remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    /// Periodic tick
    Tick(SessionId),
    /// The alarm for the trigger time fired
    Alarm(SessionId),
}

impl Wakeup {
    /// Returns the session this wake-up belongs to.
    pub fn session(&self) -> SessionId {
        match self {
            Wakeup::Tick(id) | Wakeup::Alarm(id) => *id,
        }
    }
}

// ============================================================================
// TickScheduler
// ============================================================================

/// Schedules and cancels repeating ticks.
pub trait TickScheduler {
    /// Starts a repeating tick for `session` every `period`.
    ///
    /// The first tick fires one period after scheduling.
    fn schedule_repeating(&mut self, session: SessionId, period: Duration);

    /// Stops the tick stream for `session`. Unknown ids are ignored.
    fn cancel(&mut self, session: SessionId);

    /// Number of tick streams currently scheduled.
    fn active_count(&self) -> usize;
}

// ============================================================================
// TokioTicker
// ============================================================================

/// Tick scheduler backed by `tokio::time::interval`.
///
/// Missed ticks are skipped rather than replayed, so a daemon resumed after
/// suspension gets one tick instead of a burst.
pub struct TokioTicker {
    wakeup_tx: mpsc::UnboundedSender<Wakeup>,
    tasks: HashMap<SessionId, JoinHandle<()>>,
}

impl TokioTicker {
    /// Creates a ticker that delivers ticks on `wakeup_tx`.
    pub fn new(wakeup_tx: mpsc::UnboundedSender<Wakeup>) -> Self {
        Self {
            wakeup_tx,
            tasks: HashMap::new(),
        }
    }
}

impl TickScheduler for TokioTicker {
    fn schedule_repeating(&mut self, session: SessionId, period: Duration) {
        self.cancel(session);

        let tx = self.wakeup_tx.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if tx.send(Wakeup::Tick(session)).is_err() {
                    break;
                }
            }
        });

        debug!("ティックを開始しました: {} ({:?})", session, period);
        self.tasks.insert(session, handle);
    }

    fn cancel(&mut self, session: SessionId) {
        if let Some(handle) = self.tasks.remove(&session) {
            handle.abort();
            debug!("ティックを停止しました: {}", session);
        }
    }

    fn active_count(&self) -> usize {
        self.tasks.len()
    }
}

impl Drop for TokioTicker {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}

// ============================================================================
// ManualTicker
// ============================================================================

/// Tick scheduler that only records what was asked of it.
///
/// Tests deliver ticks themselves by calling the timer. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ManualTicker {
    active: Arc<Mutex<BTreeSet<SessionId>>>,
    scheduled: Arc<Mutex<Vec<(SessionId, Duration)>>>,
}

impl ManualTicker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions with a live tick stream.
    #[must_use]
    pub fn active_sessions(&self) -> Vec<SessionId> {
        self.active.lock().unwrap().iter().copied().collect()
    }

    /// Every schedule call, in order.
    #[must_use]
    pub fn scheduled(&self) -> Vec<(SessionId, Duration)> {
        self.scheduled.lock().unwrap().clone()
    }
}

impl TickScheduler for ManualTicker {
    fn schedule_repeating(&mut self, session: SessionId, period: Duration) {
        self.active.lock().unwrap().insert(session);
        self.scheduled.lock().unwrap().push((session, period));
    }

    fn cancel(&mut self, session: SessionId) {
        self.active.lock().unwrap().remove(&session);
    }

    fn active_count(&self) -> usize {
        self.active.lock().unwrap().len()
    }
}

// ============================================================================
// Tests
// ============================================================================
