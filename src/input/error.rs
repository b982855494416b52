//! Input validation error types.

use std::fmt;

use thiserror::Error;

/// Which picker field an input error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// The minutes field
    Minutes,
    /// The seconds field
    Seconds,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Minutes => f.write_str("分"),
            Field::Seconds => f.write_str("秒"),
        }
    }
}

/// Errors produced while validating a countdown duration.
///
/// The display text is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The field is not an integer.
    #[error("{field}には整数を入力してください: '{value}'")]
    NotANumber {
        /// Offending field
        field: Field,
        /// Raw input
        value: String,
    },

    /// Minutes outside 0-60.
    #[error("分は0-60の範囲で指定してください: {0}")]
    MinutesOutOfRange(i64),

    /// Seconds outside 0-59.
    #[error("秒は0-59の範囲で指定してください: {0}")]
    SecondsOutOfRange(i64),

    /// 60 minutes combined with non-zero seconds.
    #[error("60分を指定した場合、秒は0にしてください")]
    ExceedsMaximum,

    /// Both fields are zero.
    #[error("1秒以上の時間を指定してください")]
    ZeroDuration,
}

impl ValidationError {
    /// Returns the field this error refers to, if any.
    #[must_use]
    pub fn field(&self) -> Option<Field> {
        match self {
            Self::NotANumber { field, .. } => Some(*field),
            Self::MinutesOutOfRange(_) => Some(Field::Minutes),
            Self::SecondsOutOfRange(_) | Self::ExceedsMaximum => Some(Field::Seconds),
            Self::ZeroDuration => None,
        }
    }
}
