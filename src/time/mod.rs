//! Time handling for the countdown timer.
//!
//! - `convert`: minute/second ⇄ millisecond conversion and `MM : SS` formatting
//! - `clock`: injectable clock so the countdown can be driven without real time

pub mod clock;
pub mod convert;

pub use clock::{Clock, ManualClock, SystemClock};
pub use convert::{format_remaining, split_millis, to_millis, MILLIS_PER_MINUTE, MILLIS_PER_SECOND};
