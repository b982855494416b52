//! Validation of free-text duration input.
//!
//! Both the CLI and the daemon run input through [`parse_duration`] before
//! touching the countdown, so a rejected value never changes any state.

pub mod error;

pub use self::error::{Field, ValidationError};

use crate::types::CountdownDuration;

/// Parses one integer field, trimming surrounding whitespace.
fn parse_field(field: Field, text: &str) -> Result<i64, ValidationError> {
    text.trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::NotANumber {
            field,
            value: text.to_string(),
        })
}

/// Parses minutes and seconds text into a startable duration.
///
/// # Errors
///
/// Returns an error if either field is not an integer, is out of range, or if
/// the resulting duration is zero.
pub fn parse_duration(
    minutes_text: &str,
    seconds_text: &str,
) -> Result<CountdownDuration, ValidationError> {
    let minutes = parse_field(Field::Minutes, minutes_text)?;
    let seconds = parse_field(Field::Seconds, seconds_text)?;

    let minutes =
        u32::try_from(minutes).map_err(|_| ValidationError::MinutesOutOfRange(minutes))?;
    let seconds =
        u32::try_from(seconds).map_err(|_| ValidationError::SecondsOutOfRange(seconds))?;

    let duration = CountdownDuration::new(minutes, seconds)?;
    if duration.is_zero() {
        return Err(ValidationError::ZeroDuration);
    }
    Ok(duration)
}
