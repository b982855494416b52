//! Countdown Timer Library
//!
//! This library provides the core functionality for the countdown CLI.
//! It includes:
//! - Countdown engine driven by an injected clock and cancellable ticks
//! - Input validation for minute/second selections
//! - Persistence of the trigger timestamp across daemon restarts
//! - Alarm scheduling and desktop notifications
//! - IPC server/client for daemon-CLI communication
//! - CLI command parsing and display utilities

pub mod alarm;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod input;
pub mod notification;
pub mod store;
pub mod time;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    CountdownDuration, CountdownSnapshot, CountdownState, IpcRequest, IpcResponse, ResponseData,
    SessionId, StartParams, TimerPhase,
};

pub use alarm::{AlarmError, AlarmScheduler, MockAlarm, SystemAlarm, TokioAlarm};
pub use config::{ConfigError, CountdownConfig};
pub use daemon::{
    CountdownTimer, Daemon, ManualTicker, RestoreOutcome, TickScheduler, TimerError,
    TimerSettings, TokioTicker, Wakeup,
};
pub use input::{parse_duration, ValidationError};
pub use notification::{LogNotifier, MockNotifier, NotificationError, Notifier, SystemNotifier};
pub use store::{FileTriggerStore, MemoryTriggerStore, StoreError, TriggerStore};
pub use time::{format_remaining, split_millis, to_millis, Clock, ManualClock, SystemClock};
