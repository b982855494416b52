//! Countdown engine.
//!
//! The engine owns the Idle → Running → Completed state machine:
//! - Remaining time is always recomputed from the absolute trigger timestamp
//! - Ticks and alarm wake-ups are tagged with a [`SessionId`]; stale ones are dropped
//! - The trigger is persisted so a restarted daemon can resume
//! - Every transition publishes a [`CountdownSnapshot`] on a watch channel

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::alarm::AlarmScheduler;
use crate::config::CountdownConfig;
use crate::input::{parse_duration, ValidationError};
use crate::notification::Notifier;
use crate::store::TriggerStore;
use crate::time::{Clock, MILLIS_PER_MINUTE};
use crate::types::{CountdownDuration, CountdownSnapshot, CountdownState, SessionId};

use super::ticker::{TickScheduler, Wakeup};

/// Longest remaining time a restored trigger may have (60:00).
const MAX_RESTORE_MILLIS: i64 = 60 * MILLIS_PER_MINUTE;

// ============================================================================
// TimerError
// ============================================================================

/// Errors returned by countdown operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TimerError {
    /// The operation needs an idle countdown
    #[error("タイマーは既に実行中です")]
    Running,

    /// The operation needs a running countdown
    #[error("タイマーは実行されていません")]
    NotRunning,

    /// Start was requested with 00:00 selected
    #[error("時間が設定されていません")]
    NothingToStart,

    /// The requested trigger time is not in the future
    #[error("終了時刻が既に過ぎています")]
    TriggerElapsed,

    /// Rejected input
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// ============================================================================
// TimerSettings
// ============================================================================

/// Engine settings taken from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSettings {
    /// Period of the repeating tick
    pub tick_interval: Duration,
    /// Title of the completion notification
    pub notification_title: String,
    /// Body of the completion notification
    pub notification_body: String,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self::from(&CountdownConfig::default())
    }
}

impl From<&CountdownConfig> for TimerSettings {
    fn from(config: &CountdownConfig) -> Self {
        Self {
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            notification_title: config.notification_title.clone(),
            notification_body: config.notification_body.clone(),
        }
    }
}

// ============================================================================
// RestoreOutcome
// ============================================================================

/// What [`CountdownTimer::restore`] found in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Nothing usable was stored
    Fresh,
    /// A countdown was still in progress and is running again
    Resumed {
        /// Remaining milliseconds at restore time
        remaining_millis: i64,
    },
    /// The stored countdown ran out while the daemon was away
    Elapsed,
}

// ============================================================================
// CountdownTimer
// ============================================================================

/// The running countdown: who it is and when it ends.
#[derive(Debug, Clone, Copy)]
struct CountdownSession {
    id: SessionId,
    trigger_at: i64,
}

/// Countdown engine with its collaborators.
pub struct CountdownTimer<S, A, N> {
    clock: Arc<dyn Clock>,
    ticker: Box<dyn TickScheduler + Send>,
    store: S,
    alarm: A,
    notifier: N,
    settings: TimerSettings,
    state: CountdownState,
    session: Option<CountdownSession>,
    next_session: u64,
    snapshot_tx: watch::Sender<CountdownSnapshot>,
}

impl<S, A, N> CountdownTimer<S, A, N>
where
    S: TriggerStore,
    A: AlarmScheduler,
    N: Notifier,
{
    /// Creates an idle engine with nothing selected.
    pub fn new(
        clock: Arc<dyn Clock>,
        ticker: Box<dyn TickScheduler + Send>,
        store: S,
        alarm: A,
        notifier: N,
        settings: TimerSettings,
    ) -> Self {
        let state = CountdownState::new();
        let (snapshot_tx, _) = watch::channel(state.snapshot());

        Self {
            clock,
            ticker,
            store,
            alarm,
            notifier,
            settings,
            state,
            session: None,
            next_session: 1,
            snapshot_tx,
        }
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Changes the selected minutes. Selecting 60 resets seconds to 0.
    ///
    /// # Errors
    ///
    /// Returns an error while running or if the value is out of range.
    pub fn set_minutes(&mut self, minutes: u32) -> Result<(), TimerError> {
        self.ensure_idle()?;
        let selection = self.state.selection().with_minutes(minutes)?;
        self.select(selection);
        Ok(())
    }

    /// Changes the selected seconds.
    ///
    /// # Errors
    ///
    /// Returns an error while running or if the value is out of range.
    pub fn set_seconds(&mut self, seconds: u32) -> Result<(), TimerError> {
        self.ensure_idle()?;
        let selection = self.state.selection().with_seconds(seconds)?;
        self.select(selection);
        Ok(())
    }

    /// Replaces the whole selection.
    ///
    /// # Errors
    ///
    /// Returns an error while running.
    pub fn set_duration(&mut self, duration: CountdownDuration) -> Result<(), TimerError> {
        self.ensure_idle()?;
        self.select(duration);
        Ok(())
    }

    /// Validates free-text input and selects it.
    ///
    /// The state is left untouched when the input is rejected.
    ///
    /// # Errors
    ///
    /// Returns an error while running or if either field is invalid.
    pub fn apply_input(
        &mut self,
        minutes: &str,
        seconds: &str,
    ) -> Result<CountdownDuration, TimerError> {
        self.ensure_idle()?;
        let duration = parse_duration(minutes, seconds)?;
        self.select(duration);
        Ok(duration)
    }

    fn ensure_idle(&self) -> Result<(), TimerError> {
        if self.state.is_running() {
            return Err(TimerError::Running);
        }
        Ok(())
    }

    fn select(&mut self, duration: CountdownDuration) {
        self.state.select(duration);
        debug!("時間を設定しました: {}", duration);
        self.publish();
    }

    // ------------------------------------------------------------------------
    // Start / stop
    // ------------------------------------------------------------------------

    /// Starts counting down the current selection.
    ///
    /// A countdown that is already running is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is selected.
    pub async fn start(&mut self) -> Result<SessionId, TimerError> {
        let selection = self.state.selection();
        if selection.is_zero() {
            return Err(TimerError::NothingToStart);
        }
        let trigger_at = self.clock.now_millis() + selection.to_millis();
        self.start_at(trigger_at).await
    }

    /// Starts a countdown that ends at `trigger_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if `trigger_at` is not in the future.
    pub async fn start_at(&mut self, trigger_at: i64) -> Result<SessionId, TimerError> {
        let now = self.clock.now_millis();
        if trigger_at <= now {
            return Err(TimerError::TriggerElapsed);
        }

        if let Some(previous) = self.session.take() {
            self.cancel_session(previous.id).await;
            debug!("実行中のカウントダウンを置き換えます: {}", previous.id);
        }
        self.notifier.cancel_all().await;

        if let Err(e) = self.store.save(trigger_at).await {
            warn!("トリガー時刻を保存できませんでした: {}", e);
        }

        let id = self.arm(trigger_at, now).await;
        info!(
            "カウントダウンを開始しました: {} (残り {})",
            id,
            self.state.snapshot().display()
        );
        Ok(id)
    }

    /// Stops the running countdown.
    ///
    /// What was left becomes the new selection, floored to whole seconds.
    ///
    /// # Errors
    ///
    /// Returns an error if no countdown is running.
    pub async fn stop(&mut self) -> Result<(), TimerError> {
        let session = match self.session.take() {
            Some(session) if self.state.is_running() => session,
            _ => return Err(TimerError::NotRunning),
        };

        self.cancel_session(session.id).await;
        self.clear_store().await;

        let remaining = session.trigger_at.saturating_sub(self.clock.now_millis());
        self.state.stop(remaining);
        self.publish();

        info!(
            "カウントダウンを停止しました: {} (残り {})",
            session.id,
            self.state.selection()
        );
        Ok(())
    }

    /// Sets up ticks and the alarm for a new session.
    async fn arm(&mut self, trigger_at: i64, now: i64) -> SessionId {
        let id = SessionId(self.next_session);
        self.next_session += 1;

        self.session = Some(CountdownSession { id, trigger_at });
        self.state.begin(trigger_at, trigger_at.saturating_sub(now));

        if let Err(e) = self.alarm.schedule_once(trigger_at, id).await {
            if e.is_permission_error() {
                warn!("通知が許可されていないため、アラームを設定できませんでした");
            } else {
                warn!("アラームを設定できませんでした: {}", e);
            }
            self.state.set_warning(Some(e.to_string()));
        }
        self.ticker
            .schedule_repeating(id, self.settings.tick_interval);

        self.publish();
        id
    }

    async fn cancel_session(&mut self, id: SessionId) {
        self.ticker.cancel(id);
        self.alarm.cancel(id).await;
    }

    async fn clear_store(&mut self) {
        if let Err(e) = self.store.clear().await {
            warn!("トリガー時刻を削除できませんでした: {}", e);
        }
    }

    // ------------------------------------------------------------------------
    // Ticks
    // ------------------------------------------------------------------------

    /// Handles a tick or alarm delivered by the daemon loop.
    ///
    /// Returns true if this wake-up completed the countdown.
    pub async fn on_wakeup(&mut self, wakeup: Wakeup) -> bool {
        if let Wakeup::Alarm(id) = wakeup {
            debug!("アラームを受信しました: {}", id);
        }
        self.on_tick(wakeup.session()).await
    }

    /// Recomputes the remaining time for `session`.
    ///
    /// Ticks for any session other than the running one are ignored.
    /// Returns true if this tick completed the countdown.
    pub async fn on_tick(&mut self, session: SessionId) -> bool {
        let current = match self.session {
            Some(current) if current.id == session && self.state.is_running() => current,
            _ => {
                debug!("古いティックを無視しました: {}", session);
                return false;
            }
        };

        let remaining = current.trigger_at.saturating_sub(self.clock.now_millis());
        if remaining > 0 {
            self.state.update_remaining(remaining);
            self.publish();
            return false;
        }

        self.complete(current).await;
        true
    }

    async fn complete(&mut self, session: CountdownSession) {
        self.session = None;
        self.cancel_session(session.id).await;
        self.clear_store().await;

        self.state.complete();
        self.publish();
        info!("カウントダウンが終了しました: {}", session.id);

        if let Err(e) = self
            .notifier
            .post(
                &self.settings.notification_title,
                &self.settings.notification_body,
            )
            .await
        {
            warn!("通知の送信に失敗しました: {}", e);
        }
    }

    // ------------------------------------------------------------------------
    // Restore
    // ------------------------------------------------------------------------

    /// Picks up a countdown persisted by an earlier process.
    ///
    /// A trigger still in the future resumes silently. One that has already
    /// passed is cleared and reported as completed without a notification.
    /// A trigger further away than the longest countdown cannot have been
    /// written by a start, so it is cleared and ignored.
    pub async fn restore(&mut self) -> RestoreOutcome {
        let trigger_at = match self.store.load().await {
            Ok(Some(trigger_at)) => trigger_at,
            Ok(None) => return RestoreOutcome::Fresh,
            Err(e) => {
                warn!("保存されたトリガー時刻を読み込めませんでした: {}", e);
                return RestoreOutcome::Fresh;
            }
        };

        let now = self.clock.now_millis();
        let remaining = trigger_at.saturating_sub(now);

        if remaining > MAX_RESTORE_MILLIS {
            warn!("保存されたトリガー時刻が不正です: {}", trigger_at);
            self.clear_store().await;
            return RestoreOutcome::Fresh;
        }

        if remaining <= 0 {
            self.clear_store().await;
            self.state.complete();
            self.publish();
            info!("保存されたカウントダウンは既に終了しています");
            return RestoreOutcome::Elapsed;
        }

        self.state
            .select(CountdownDuration::from_millis_saturating(remaining));
        let id = self.arm(trigger_at, now).await;
        info!(
            "カウントダウンを再開しました: {} (残り {})",
            id,
            self.state.snapshot().display()
        );
        RestoreOutcome::Resumed {
            remaining_millis: remaining,
        }
    }

    // ------------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------------

    /// Returns a receiver that sees every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<CountdownSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> CountdownSnapshot {
        self.state.snapshot()
    }

    /// Id of the running session, if any.
    pub fn session(&self) -> Option<SessionId> {
        self.session.map(|s| s.id)
    }

    /// Settings the engine was created with.
    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    /// The trigger store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The alarm scheduler.
    pub fn alarm(&self) -> &A {
        &self.alarm
    }

    /// The completion notifier.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.state.snapshot());
    }
}

// ============================================================================
// Tests
// ============================================================================
