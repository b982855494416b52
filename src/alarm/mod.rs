//! One-shot alarms at the trigger time.
//!
//! Ticks alone only work while the daemon runs. The alarm is the second line:
//!
//! - [`TokioAlarm`] sleeps until the trigger and sends a [`Wakeup::Alarm`]
//!   to the daemon loop, so completion is noticed even if ticks were skipped.
//! - On macOS, `NotificationAlarm` hands a scheduled notification to the
//!   system, which delivers it at the trigger time even if the daemon has
//!   been suspended or killed.
//!
//! The tokio alarm is keyed by the session id, which serves as the callback
//! token. The notification alarm outlives the process that scheduled it, so
//! it uses one fixed request identifier instead: only one countdown exists at
//! a time, and a restarted daemon can replace or withdraw the request left by
//! its predecessor.

pub mod error;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::debug;

pub use self::error::AlarmError;

use crate::config::CountdownConfig;
use crate::daemon::ticker::Wakeup;
use crate::time::Clock;
use crate::types::SessionId;

/// Arranges a wake-up at an absolute time.
#[allow(async_fn_in_trait)]
pub trait AlarmScheduler {
    /// Schedules a single wake-up for `session` at `trigger_at`.
    ///
    /// Scheduling again for the same session replaces the earlier alarm.
    async fn schedule_once(&mut self, trigger_at: i64, session: SessionId)
        -> Result<(), AlarmError>;

    /// Cancels the alarm for `session`. Unknown ids are ignored.
    async fn cancel(&mut self, session: SessionId);
}

// ============================================================================
// TokioAlarm
// ============================================================================

/// In-process alarm backed by `tokio::time::sleep`.
///
/// Delivery is at-least-once while the daemon is alive. The delay is measured
/// on tokio's monotonic clock, so after a system sleep the alarm may fire late;
/// the timer recomputes from the absolute trigger either way.
pub struct TokioAlarm {
    clock: Arc<dyn Clock>,
    wakeup_tx: mpsc::UnboundedSender<Wakeup>,
    tasks: HashMap<SessionId, JoinHandle<()>>,
}

impl TokioAlarm {
    /// Creates an alarm that delivers on `wakeup_tx`.
    pub fn new(clock: Arc<dyn Clock>, wakeup_tx: mpsc::UnboundedSender<Wakeup>) -> Self {
        Self {
            clock,
            wakeup_tx,
            tasks: HashMap::new(),
        }
    }

    /// Number of alarms waiting to fire.
    pub fn pending_count(&self) -> usize {
        self.tasks.values().filter(|h| !h.is_finished()).count()
    }
}

impl AlarmScheduler for TokioAlarm {
    async fn schedule_once(
        &mut self,
        trigger_at: i64,
        session: SessionId,
    ) -> Result<(), AlarmError> {
        self.cancel(session).await;

        let delay_ms = trigger_at.saturating_sub(self.clock.now_millis()).max(0);
        let delay = Duration::from_millis(delay_ms as u64);
        let tx = self.wakeup_tx.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Wakeup::Alarm(session));
        });

        debug!("アラームを設定しました: {} ({}ms後)", session, delay_ms);
        self.tasks.insert(session, handle);
        Ok(())
    }

    async fn cancel(&mut self, session: SessionId) {
        if let Some(handle) = self.tasks.remove(&session) {
            handle.abort();
            debug!("アラームを解除しました: {}", session);
        }
    }
}

impl Drop for TokioAlarm {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}

// ============================================================================
// NotificationAlarm (macOS)
// ============================================================================

/// Identifier of the pending alarm request, shared by every session.
#[cfg(target_os = "macos")]
pub const ALARM_REQUEST_IDENTIFIER: &str = "countdown.alarm";

/// Schedules the completion banner with the system notification center.
#[cfg(target_os = "macos")]
pub struct NotificationAlarm {
    clock: Arc<dyn Clock>,
    title: String,
    body: String,
}

#[cfg(target_os = "macos")]
impl NotificationAlarm {
    /// Creates an alarm that shows `title`/`body` at the trigger time.
    pub fn new(clock: Arc<dyn Clock>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            clock,
            title: title.into(),
            body: body.into(),
        }
    }

    /// Request identifier used for `session`.
    ///
    /// Session ids restart at 1 in every daemon process, so they cannot name
    /// a request that may have been scheduled by an earlier process.
    #[must_use]
    pub fn identifier(_session: SessionId) -> &'static str {
        ALARM_REQUEST_IDENTIFIER
    }
}

#[cfg(target_os = "macos")]
impl AlarmScheduler for NotificationAlarm {
    async fn schedule_once(
        &mut self,
        trigger_at: i64,
        session: SessionId,
    ) -> Result<(), AlarmError> {
        use crate::notification::center::NotificationCenter;
        use crate::notification::content::create_completion_content;
        use crate::notification::request::create_scheduled_request;

        let authorized = NotificationCenter::is_authorized()
            .await
            .map_err(|e| AlarmError::ScheduleFailed(e.to_string()))?;
        if !authorized {
            return Err(AlarmError::PermissionDenied);
        }

        // Replaces whatever an earlier session or process left behind
        NotificationCenter::remove_notification(Self::identifier(session));

        // The system rejects non-positive intervals; ticks cover the last second
        let delay_secs = trigger_at.saturating_sub(self.clock.now_millis()) as f64 / 1000.0;
        if delay_secs < 1.0 {
            return Ok(());
        }

        let identifier = Self::identifier(session);
        let content = create_completion_content(&self.title, &self.body);
        let request = create_scheduled_request(identifier, &content, delay_secs);

        NotificationCenter::add_notification_request(&request)
            .await
            .map_err(|e| AlarmError::ScheduleFailed(e.to_string()))?;

        debug!("通知アラームを設定しました: {} ({:.0}秒後)", session, delay_secs);
        Ok(())
    }

    async fn cancel(&mut self, session: SessionId) {
        // Also withdraws an alarm banner that was already delivered, so the
        // completion notification posted afterwards is the only one shown
        crate::notification::center::NotificationCenter::remove_notification(Self::identifier(
            session,
        ));
    }
}

// ============================================================================
// SystemAlarm
// ============================================================================

/// The alarm used by the daemon on this platform.
pub enum SystemAlarm {
    /// System-scheduled notification
    #[cfg(target_os = "macos")]
    Notification(NotificationAlarm),
    /// In-process timer
    Tokio(TokioAlarm),
}

impl SystemAlarm {
    /// Creates the platform alarm.
    pub fn new(
        clock: Arc<dyn Clock>,
        wakeup_tx: mpsc::UnboundedSender<Wakeup>,
        config: &CountdownConfig,
    ) -> Self {
        #[cfg(target_os = "macos")]
        {
            let _ = wakeup_tx;
            Self::Notification(NotificationAlarm::new(
                clock,
                config.notification_title.clone(),
                config.notification_body.clone(),
            ))
        }

        #[cfg(not(target_os = "macos"))]
        {
            let _ = config;
            Self::Tokio(TokioAlarm::new(clock, wakeup_tx))
        }
    }
}

impl AlarmScheduler for SystemAlarm {
    async fn schedule_once(
        &mut self,
        trigger_at: i64,
        session: SessionId,
    ) -> Result<(), AlarmError> {
        match self {
            #[cfg(target_os = "macos")]
            Self::Notification(alarm) => alarm.schedule_once(trigger_at, session).await,
            Self::Tokio(alarm) => alarm.schedule_once(trigger_at, session).await,
        }
    }

    async fn cancel(&mut self, session: SessionId) {
        match self {
            #[cfg(target_os = "macos")]
            Self::Notification(alarm) => alarm.cancel(session).await,
            Self::Tokio(alarm) => alarm.cancel(session).await,
        }
    }
}

// ============================================================================
// MockAlarm
// ============================================================================

#[derive(Debug, Default)]
struct MockAlarmState {
    scheduled: HashMap<SessionId, i64>,
    cancelled: Vec<SessionId>,
    should_fail: bool,
}

/// Alarm that records calls. Clones share state.
#[derive(Debug, Default, Clone)]
pub struct MockAlarm {
    state: Arc<Mutex<MockAlarmState>>,
}

impl MockAlarm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `schedule_once` fail with `PermissionDenied`.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.state.lock().unwrap().should_fail = should_fail;
    }

    /// Trigger time of the pending alarm for `session`.
    #[must_use]
    pub fn scheduled_at(&self, session: SessionId) -> Option<i64> {
        self.state.lock().unwrap().scheduled.get(&session).copied()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.lock().unwrap().scheduled.len()
    }

    #[must_use]
    pub fn cancelled(&self) -> Vec<SessionId> {
        self.state.lock().unwrap().cancelled.clone()
    }
}

impl AlarmScheduler for MockAlarm {
    async fn schedule_once(
        &mut self,
        trigger_at: i64,
        session: SessionId,
    ) -> Result<(), AlarmError> {
        let mut state = self.state.lock().unwrap();
        if state.should_fail {
            return Err(AlarmError::PermissionDenied);
        }
        state.scheduled.insert(session, trigger_at);
        Ok(())
    }

    async fn cancel(&mut self, session: SessionId) {
        let mut state = self.state.lock().unwrap();
        state.scheduled.remove(&session);
        state.cancelled.push(session);
    }
}

// ============================================================================
// Tests
// ============================================================================
