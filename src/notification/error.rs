//! Notification system error types.
//!
//! This module defines the error types for the notification system.
//! All errors carry a message suitable for logging; none of them stop the
//! countdown itself.

use thiserror::Error;

/// Errors that can occur in the notification system.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Failed to request notification authorization from the system.
    #[error("通知許可の取得に失敗しました: {0}")]
    AuthorizationFailed(String),

    /// Failed to send a notification.
    #[error("通知の送信に失敗しました: {0}")]
    SendFailed(String),

    /// Notification permission was denied by the user.
    #[error("通知許可が拒否されています")]
    PermissionDenied,

    /// Failed to initialize the notification system.
    #[error("通知システムの初期化に失敗しました: {0}")]
    InitializationFailed(String),

    /// The notification service is not available on this system.
    #[error("通知サービスが利用できません")]
    NotAvailable,
}

impl NotificationError {
    /// Returns true if this error is related to permissions.
    #[must_use]
    pub fn is_permission_error(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied | Self::AuthorizationFailed(_)
        )
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::AuthorizationFailed(_) | Self::PermissionDenied => {
                "システム設定の通知でアプリの通知を許可してください"
            }
            Self::SendFailed(_) => "通知センターを確認してください",
            Self::InitializationFailed(_) => "デーモンを再起動してください",
            Self::NotAvailable => "通知デーモン(デスクトップ環境)が起動しているか確認してください",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NotificationError::PermissionDenied;
        assert_eq!(err.to_string(), "通知許可が拒否されています");

        let err = NotificationError::AuthorizationFailed("test".to_string());
        assert!(err.to_string().contains("test"));
    }

    #[test]
    fn test_is_permission_error() {
        assert!(NotificationError::PermissionDenied.is_permission_error());
        assert!(NotificationError::AuthorizationFailed("x".into()).is_permission_error());
        assert!(!NotificationError::NotAvailable.is_permission_error());
    }

    #[test]
    fn test_suggestion() {
        let err = NotificationError::PermissionDenied;
        assert!(err.suggestion().contains("許可"));
    }
}
