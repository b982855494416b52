//! Core data types for the countdown timer.
//!
//! This module defines the data structures used for:
//! - The selected countdown duration with range validation
//! - Countdown state and the immutable snapshots published from it
//! - IPC request/response serialization

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::input::ValidationError;
use crate::time::{format_remaining, split_millis, to_millis};

/// Largest selectable number of minutes.
pub const MAX_MINUTES: u32 = 60;

/// Largest selectable number of seconds.
pub const MAX_SECONDS: u32 = 59;

// ============================================================================
// TimerPhase
// ============================================================================

/// Represents the current phase of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    /// No countdown is running
    #[default]
    Idle,
    /// Counting down towards the trigger time
    Running,
    /// The last countdown reached zero
    Completed,
}

impl TimerPhase {
    /// Returns the string representation of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerPhase::Idle => "idle",
            TimerPhase::Running => "running",
            TimerPhase::Completed => "completed",
        }
    }

    /// Returns true if the countdown is ticking.
    pub fn is_running(&self) -> bool {
        matches!(self, TimerPhase::Running)
    }
}

// ============================================================================
// SessionId
// ============================================================================

/// Identifies one countdown session.
///
/// Also used as the cancel token for the session's ticks and alarm, so a
/// wake-up carrying an old id can be recognised as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// CountdownDuration
// ============================================================================

/// A validated minute/second selection (00:00 to 60:00).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CountdownDuration {
    minutes: u32,
    seconds: u32,
}

impl<'de> Deserialize<'de> for CountdownDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Parts {
            minutes: u32,
            seconds: u32,
        }

        let parts = Parts::deserialize(deserializer)?;
        Self::new(parts.minutes, parts.seconds).map_err(serde::de::Error::custom)
    }
}

impl CountdownDuration {
    /// Creates a duration, checking each field's range.
    ///
    /// A zero duration is allowed here; it just cannot be started.
    ///
    /// # Errors
    ///
    /// Returns an error if minutes exceed 60, seconds exceed 59, or 60 minutes
    /// is combined with non-zero seconds.
    pub fn new(minutes: u32, seconds: u32) -> Result<Self, ValidationError> {
        if minutes > MAX_MINUTES {
            return Err(ValidationError::MinutesOutOfRange(i64::from(minutes)));
        }
        if seconds > MAX_SECONDS {
            return Err(ValidationError::SecondsOutOfRange(i64::from(seconds)));
        }
        if minutes == MAX_MINUTES && seconds > 0 {
            return Err(ValidationError::ExceedsMaximum);
        }
        Ok(Self { minutes, seconds })
    }

    /// The empty selection.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Builds a selection from remaining milliseconds, dropping partial seconds.
    ///
    /// Values beyond 60 minutes saturate to 60:00.
    #[must_use]
    pub fn from_millis_saturating(millis: i64) -> Self {
        let (minutes, seconds) = split_millis(millis);
        if minutes >= MAX_MINUTES {
            Self {
                minutes: MAX_MINUTES,
                seconds: 0,
            }
        } else {
            Self { minutes, seconds }
        }
    }

    /// Returns a copy with new minutes.
    ///
    /// Selecting 60 minutes resets seconds to 0.
    ///
    /// # Errors
    ///
    /// Returns an error if minutes exceed 60.
    pub fn with_minutes(self, minutes: u32) -> Result<Self, ValidationError> {
        let seconds = if minutes == MAX_MINUTES { 0 } else { self.seconds };
        Self::new(minutes, seconds)
    }

    /// Returns a copy with new seconds.
    ///
    /// # Errors
    ///
    /// Returns an error if seconds exceed 59 or minutes are already 60.
    pub fn with_seconds(self, seconds: u32) -> Result<Self, ValidationError> {
        Self::new(self.minutes, seconds)
    }

    /// Minutes component.
    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    /// Seconds component.
    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    /// Total length in milliseconds.
    pub fn to_millis(&self) -> i64 {
        to_millis(self.minutes, self.seconds)
    }

    /// Returns true if nothing is selected.
    pub fn is_zero(&self) -> bool {
        self.minutes == 0 && self.seconds == 0
    }
}

impl fmt::Display for CountdownDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_remaining(self.to_millis()))
    }
}

// ============================================================================
// CountdownState
// ============================================================================

/// Mutable countdown state owned by the timer.
///
/// Every change is published to observers as a [`CountdownSnapshot`].
#[derive(Debug, Clone, Default)]
pub struct CountdownState {
    /// Current phase
    pub phase: TimerPhase,
    /// Remaining milliseconds; mirrors the selection while not running
    pub remaining_millis: i64,
    selection: CountdownDuration,
    trigger_at: Option<i64>,
    warning: Option<String>,
}

impl CountdownState {
    /// Creates an idle state with nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the selection.
    ///
    /// Leaves a completed countdown behind and returns to idle.
    pub fn select(&mut self, selection: CountdownDuration) {
        self.selection = selection;
        self.remaining_millis = selection.to_millis();
        if self.phase == TimerPhase::Completed {
            self.phase = TimerPhase::Idle;
        }
        self.warning = None;
    }

    /// Enters the running phase.
    pub fn begin(&mut self, trigger_at: i64, remaining_millis: i64) {
        self.phase = TimerPhase::Running;
        self.trigger_at = Some(trigger_at);
        self.remaining_millis = remaining_millis;
        self.warning = None;
    }

    /// Updates the remaining time after a tick.
    pub fn update_remaining(&mut self, remaining_millis: i64) {
        self.remaining_millis = remaining_millis.max(0);
    }

    /// Marks the countdown as finished and clears the selection.
    pub fn complete(&mut self) {
        self.phase = TimerPhase::Completed;
        self.remaining_millis = 0;
        self.selection = CountdownDuration::zero();
        self.trigger_at = None;
    }

    /// Returns to idle, keeping what was left as the new selection.
    pub fn stop(&mut self, remaining_millis: i64) {
        self.phase = TimerPhase::Idle;
        self.trigger_at = None;
        self.selection = CountdownDuration::from_millis_saturating(remaining_millis);
        self.remaining_millis = self.selection.to_millis();
        self.warning = None;
    }

    /// Records a non-fatal problem to show alongside the state.
    pub fn set_warning(&mut self, warning: Option<String>) {
        self.warning = warning;
    }

    /// The current selection.
    pub fn selection(&self) -> CountdownDuration {
        self.selection
    }

    /// Trigger timestamp of the running countdown.
    pub fn trigger_at(&self) -> Option<i64> {
        self.trigger_at
    }

    /// Returns true if the countdown is ticking.
    pub fn is_running(&self) -> bool {
        self.phase.is_running()
    }

    /// Returns true if the start control should be offered.
    pub fn can_start(&self) -> bool {
        !self.is_running() && !self.selection.is_zero()
    }

    /// Takes an immutable snapshot of the state.
    pub fn snapshot(&self) -> CountdownSnapshot {
        CountdownSnapshot {
            phase: self.phase,
            remaining_millis: self.remaining_millis,
            selection: self.selection,
            can_start: self.can_start(),
            trigger_at: self.trigger_at,
            warning: self.warning.clone(),
        }
    }
}

// ============================================================================
// CountdownSnapshot
// ============================================================================

/// Immutable view of the countdown, published on every transition and tick.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CountdownSnapshot {
    /// Current phase
    pub phase: TimerPhase,
    /// Remaining milliseconds
    pub remaining_millis: i64,
    /// Selected duration
    pub selection: CountdownDuration,
    /// Whether the start control should be offered
    pub can_start: bool,
    /// Trigger timestamp while running
    pub trigger_at: Option<i64>,
    /// Non-fatal problem, e.g. the alarm could not be scheduled
    pub warning: Option<String>,
}

impl CountdownSnapshot {
    /// Returns the remaining time as display text.
    pub fn display(&self) -> String {
        format_remaining(self.remaining_millis)
    }

    /// Returns true if the countdown is ticking.
    pub fn is_running(&self) -> bool {
        self.phase.is_running()
    }
}

// ============================================================================
// IPC Types
// ============================================================================

/// Parameters for the start command.
///
/// Values are raw text; the daemon validates them before use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartParams {
    /// Minutes text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes: Option<String>,
    /// Seconds text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds: Option<String>,
}

impl StartParams {
    /// Returns true if no duration was supplied.
    pub fn is_empty(&self) -> bool {
        self.minutes.is_none() && self.seconds.is_none()
    }
}

/// IPC request from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum IpcRequest {
    /// Start a countdown, optionally selecting a new duration first
    Start {
        /// Start parameters
        #[serde(flatten)]
        params: StartParams,
    },
    /// Change the selected duration without starting
    Set {
        /// Minutes text
        minutes: String,
        /// Seconds text
        seconds: String,
    },
    /// Stop the running countdown
    Stop,
    /// Query the current status
    Status,
}

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseData {
    /// Current phase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Remaining milliseconds
    #[serde(rename = "remainingMillis", skip_serializing_if = "Option::is_none")]
    pub remaining_millis: Option<i64>,
    /// Remaining time as display text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    /// Selected minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes: Option<u32>,
    /// Selected seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds: Option<u32>,
    /// Whether a countdown can be started
    #[serde(rename = "canStart", skip_serializing_if = "Option::is_none")]
    pub can_start: Option<bool>,
    /// Trigger timestamp while running
    #[serde(rename = "triggerAt", skip_serializing_if = "Option::is_none")]
    pub trigger_at: Option<i64>,
    /// Non-fatal warning
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ResponseData {
    /// Creates response data from a countdown snapshot.
    pub fn from_snapshot(snapshot: &CountdownSnapshot) -> Self {
        Self {
            state: Some(snapshot.phase.as_str().to_string()),
            remaining_millis: Some(snapshot.remaining_millis),
            display: Some(snapshot.display()),
            minutes: Some(snapshot.selection.minutes()),
            seconds: Some(snapshot.selection.seconds()),
            can_start: Some(snapshot.can_start),
            trigger_at: snapshot.trigger_at,
            warning: snapshot.warning.clone(),
        }
    }
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Returns true for an error response.
    pub fn is_error(&self) -> bool {
        self.status == "error"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // TimerPhase Tests
    // ------------------------------------------------------------------------

    mod timer_phase_tests {
        use super::*;

        #[test]
        fn test_default_is_idle() {
            assert_eq!(TimerPhase::default(), TimerPhase::Idle);
        }

        #[test]
        fn test_as_str() {
            assert_eq!(TimerPhase::Idle.as_str(), "idle");
            assert_eq!(TimerPhase::Running.as_str(), "running");
            assert_eq!(TimerPhase::Completed.as_str(), "completed");
        }

        #[test]
        fn test_serialize() {
            let json = serde_json::to_string(&TimerPhase::Completed).unwrap();
            assert_eq!(json, "\"completed\"");
        }
    }

    // ------------------------------------------------------------------------
    // CountdownDuration Tests
    // ------------------------------------------------------------------------

    mod duration_tests {
        use super::*;

        #[test]
        fn test_new_valid() {
            let duration = CountdownDuration::new(25, 30).unwrap();
            assert_eq!(duration.to_millis(), 1_530_000);
            assert!(!duration.is_zero());
        }

        #[test]
        fn test_new_out_of_range() {
            assert!(CountdownDuration::new(61, 0).is_err());
            assert!(CountdownDuration::new(0, 60).is_err());
            assert_eq!(
                CountdownDuration::new(60, 30).unwrap_err(),
                ValidationError::ExceedsMaximum
            );
        }

        #[test]
        fn test_with_minutes_sixty_resets_seconds() {
            let duration = CountdownDuration::new(5, 45).unwrap();
            let duration = duration.with_minutes(60).unwrap();
            assert_eq!((duration.minutes(), duration.seconds()), (60, 0));
        }

        #[test]
        fn test_with_seconds_rejected_at_sixty_minutes() {
            let duration = CountdownDuration::new(60, 0).unwrap();
            assert!(duration.with_seconds(10).is_err());
        }

        #[test]
        fn test_from_millis_saturating() {
            let duration = CountdownDuration::from_millis_saturating(61_999);
            assert_eq!((duration.minutes(), duration.seconds()), (1, 1));

            let duration = CountdownDuration::from_millis_saturating(5_000_000);
            assert_eq!((duration.minutes(), duration.seconds()), (60, 0));
        }

        #[test]
        fn test_display() {
            let duration = CountdownDuration::new(3, 9).unwrap();
            assert_eq!(duration.to_string(), "03 : 09");
        }

        #[test]
        fn test_deserialize_validates() {
            let ok: CountdownDuration =
                serde_json::from_str(r#"{"minutes":1,"seconds":2}"#).unwrap();
            assert_eq!(ok.to_millis(), 62_000);

            let bad = serde_json::from_str::<CountdownDuration>(r#"{"minutes":1,"seconds":99}"#);
            assert!(bad.is_err());
        }
    }

    // ------------------------------------------------------------------------
    // CountdownState Tests
    // ------------------------------------------------------------------------

    mod countdown_state_tests {
        use super::*;

        fn selection(minutes: u32, seconds: u32) -> CountdownDuration {
            CountdownDuration::new(minutes, seconds).unwrap()
        }

        #[test]
        fn test_new_state() {
            let state = CountdownState::new();
            assert_eq!(state.phase, TimerPhase::Idle);
            assert_eq!(state.remaining_millis, 0);
            assert!(!state.can_start());
        }

        #[test]
        fn test_select_enables_start() {
            let mut state = CountdownState::new();
            state.select(selection(0, 10));
            assert_eq!(state.remaining_millis, 10_000);
            assert!(state.can_start());
        }

        #[test]
        fn test_begin_disables_start() {
            let mut state = CountdownState::new();
            state.select(selection(0, 10));
            state.begin(20_000, 10_000);
            assert!(state.is_running());
            assert!(!state.can_start());
            assert_eq!(state.trigger_at(), Some(20_000));
        }

        #[test]
        fn test_complete_clears_selection() {
            let mut state = CountdownState::new();
            state.select(selection(1, 0));
            state.begin(60_000, 60_000);
            state.complete();

            assert_eq!(state.phase, TimerPhase::Completed);
            assert_eq!(state.remaining_millis, 0);
            assert!(state.selection().is_zero());
            assert_eq!(state.trigger_at(), None);
        }

        #[test]
        fn test_select_after_complete_returns_to_idle() {
            let mut state = CountdownState::new();
            state.complete();
            state.select(selection(0, 5));
            assert_eq!(state.phase, TimerPhase::Idle);
        }

        #[test]
        fn test_stop_keeps_remaining_as_selection() {
            let mut state = CountdownState::new();
            state.select(selection(2, 0));
            state.begin(120_000, 120_000);
            state.stop(75_400);

            assert_eq!(state.phase, TimerPhase::Idle);
            assert_eq!(state.selection(), selection(1, 15));
            assert_eq!(state.remaining_millis, 75_000);
            assert!(state.can_start());
        }

        #[test]
        fn test_update_remaining_clamps() {
            let mut state = CountdownState::new();
            state.update_remaining(-20);
            assert_eq!(state.remaining_millis, 0);
        }

        #[test]
        fn test_snapshot() {
            let mut state = CountdownState::new();
            state.select(selection(0, 42));
            state.set_warning(Some("warn".to_string()));
            let snapshot = state.snapshot();

            assert_eq!(snapshot.phase, TimerPhase::Idle);
            assert_eq!(snapshot.display(), "00 : 42");
            assert!(snapshot.can_start);
            assert_eq!(snapshot.warning.as_deref(), Some("warn"));
        }
    }

    // ------------------------------------------------------------------------
    // IPC Tests
    // ------------------------------------------------------------------------

    mod ipc_tests {
        use super::*;

        #[test]
        fn test_start_request_serialize() {
            let request = IpcRequest::Start {
                params: StartParams {
                    minutes: Some("1".to_string()),
                    seconds: Some("30".to_string()),
                },
            };
            let json = serde_json::to_string(&request).unwrap();
            assert!(json.contains("\"command\":\"start\""));
            assert!(json.contains("\"minutes\":\"1\""));
            assert!(json.contains("\"seconds\":\"30\""));
        }

        #[test]
        fn test_bare_start_request_deserialize() {
            let request: IpcRequest = serde_json::from_str(r#"{"command":"start"}"#).unwrap();
            match request {
                IpcRequest::Start { params } => assert!(params.is_empty()),
                _ => panic!("Expected Start request"),
            }
        }

        #[test]
        fn test_set_request_roundtrip() {
            let json = r#"{"command":"set","minutes":"2","seconds":"5"}"#;
            let request: IpcRequest = serde_json::from_str(json).unwrap();
            match request {
                IpcRequest::Set { minutes, seconds } => {
                    assert_eq!(minutes, "2");
                    assert_eq!(seconds, "5");
                }
                _ => panic!("Expected Set request"),
            }
        }

        #[test]
        fn test_stop_and_status_serialize() {
            assert_eq!(
                serde_json::to_string(&IpcRequest::Stop).unwrap(),
                r#"{"command":"stop"}"#
            );
            assert_eq!(
                serde_json::to_string(&IpcRequest::Status).unwrap(),
                r#"{"command":"status"}"#
            );
        }

        #[test]
        fn test_response_data_from_snapshot() {
            let mut state = CountdownState::new();
            state.select(CountdownDuration::new(1, 5).unwrap());
            state.begin(70_000, 65_000);

            let data = ResponseData::from_snapshot(&state.snapshot());
            assert_eq!(data.state.as_deref(), Some("running"));
            assert_eq!(data.remaining_millis, Some(65_000));
            assert_eq!(data.display.as_deref(), Some("01 : 05"));
            assert_eq!(data.can_start, Some(false));
            assert_eq!(data.trigger_at, Some(70_000));
        }

        #[test]
        fn test_response_data_skips_none() {
            let json = serde_json::to_string(&ResponseData::default()).unwrap();
            assert_eq!(json, "{}");
        }

        #[test]
        fn test_response_constructors() {
            let ok = IpcResponse::success("ok", None);
            assert!(!ok.is_error());

            let err = IpcResponse::error("bad");
            assert!(err.is_error());
            assert_eq!(err.message, "bad");
            assert!(err.data.is_none());
        }
    }
}
