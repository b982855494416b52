//! Alarm scheduling error types.

use thiserror::Error;

/// Errors that can occur while arranging a wake-up at the trigger time.
#[derive(Debug, Error)]
pub enum AlarmError {
    /// The system refused to schedule the alarm.
    #[error("アラームの権限がありません。アプリ起動中のみカウントダウンします")]
    PermissionDenied,

    /// Scheduling failed for another reason.
    #[error("アラームの設定に失敗しました: {0}")]
    ScheduleFailed(String),
}

impl AlarmError {
    /// Returns true if this error is related to permissions.
    #[must_use]
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AlarmError::ScheduleFailed("boom".to_string());
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_is_permission_error() {
        assert!(AlarmError::PermissionDenied.is_permission_error());
        assert!(!AlarmError::ScheduleFailed("x".into()).is_permission_error());
    }
}
