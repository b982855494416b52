//! Completion notifications.
//!
//! The countdown talks to the platform through the [`Notifier`] trait:
//!
//! - macOS: `NotificationManager` over `UNUserNotificationCenter`
//! - Linux/BSD: `DesktopNotifier` over freedesktop notifications
//! - anywhere: [`LogNotifier`], used when the platform notifier cannot start
//!
//! [`SystemNotifier::new_with_fallback`] picks the best one available.
//!
//! # Requirements (macOS)
//!
//! - macOS 10.14+
//! - The binary must be code-signed for notifications to work properly:
//!
//! ```bash
//! codesign --force --deep --sign - target/release/countdown
//! ```

pub mod error;
mod text;

#[cfg(target_os = "macos")]
pub(crate) mod center;
#[cfg(target_os = "macos")]
pub(crate) mod content;
#[cfg(target_os = "macos")]
pub(crate) mod request;

#[cfg(all(unix, not(target_os = "macos")))]
mod desktop;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use tracing::{info, warn};

pub use self::error::NotificationError;
pub use self::text::{sanitize_or, sanitize_text};

#[cfg(all(unix, not(target_os = "macos")))]
pub use self::desktop::DesktopNotifier;

/// Posts and withdraws the completion notification.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    /// Shows a notification.
    async fn post(&self, title: &str, body: &str) -> Result<(), NotificationError>;

    /// Withdraws every notification this notifier has shown.
    async fn cancel_all(&self);

    /// Returns true if notifications reach the user.
    fn is_available(&self) -> bool;
}

// ============================================================================
// NotificationManager (macOS)
// ============================================================================

/// Maximum retry attempts for sending notifications.
#[cfg(target_os = "macos")]
const MAX_RETRIES: u32 = 3;

/// Delay between retry attempts in milliseconds.
#[cfg(target_os = "macos")]
const RETRY_DELAY_MS: u64 = 1000;

/// Manages macOS user notifications.
#[cfg(target_os = "macos")]
pub struct NotificationManager {
    _private: (),
}

#[cfg(target_os = "macos")]
impl NotificationManager {
    /// Requests authorization and creates the manager.
    ///
    /// # Errors
    ///
    /// Returns an error if authorization is denied or the notification
    /// center is unavailable.
    pub async fn new() -> Result<Self, NotificationError> {
        use self::center::NotificationCenter;

        let granted = NotificationCenter::request_authorization().await?;
        if !granted {
            return Err(NotificationError::PermissionDenied);
        }

        Ok(Self { _private: () })
    }

    /// Checks if notifications are currently authorized.
    pub async fn is_authorized() -> Result<bool, NotificationError> {
        self::center::NotificationCenter::is_authorized().await
    }

    /// Sends a notification, retrying on failure.
    pub async fn send_with_retry(&self, title: &str, body: &str) -> Result<(), NotificationError> {
        use self::center::NotificationCenter;

        let content = self::content::create_completion_content(title, body);
        let request = self::request::create_notification_request(&content);
        let mut retries = 0;

        loop {
            match NotificationCenter::add_notification_request(&request).await {
                Ok(()) => return Ok(()),
                Err(e) if retries < MAX_RETRIES => {
                    retries += 1;
                    warn!(
                        "通知送信失敗（リトライ {}/{}）: {}",
                        retries,
                        MAX_RETRIES,
                        e
                    );
                    tokio::time::sleep(tokio::time::Duration::from_millis(RETRY_DELAY_MS)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Removes all pending and delivered notifications.
    pub fn clear_all_notifications(&self) {
        self::center::NotificationCenter::remove_all_pending_notifications();
        self::center::NotificationCenter::remove_all_delivered_notifications();
    }
}

#[cfg(target_os = "macos")]
impl Notifier for NotificationManager {
    async fn post(&self, title: &str, body: &str) -> Result<(), NotificationError> {
        self.send_with_retry(title, body).await
    }

    async fn cancel_all(&self) {
        self.clear_all_notifications();
    }

    fn is_available(&self) -> bool {
        true
    }
}

// ============================================================================
// LogNotifier
// ============================================================================

/// Writes notifications to the log instead of the desktop.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn post(&self, title: &str, body: &str) -> Result<(), NotificationError> {
        info!("🔔 {}: {}", title, body);
        Ok(())
    }

    async fn cancel_all(&self) {}

    fn is_available(&self) -> bool {
        false
    }
}

// ============================================================================
// SystemNotifier
// ============================================================================

/// The platform notifier, or the log fallback.
pub enum SystemNotifier {
    /// macOS user notifications
    #[cfg(target_os = "macos")]
    Native(NotificationManager),
    /// Freedesktop notifications
    #[cfg(all(unix, not(target_os = "macos")))]
    Desktop(DesktopNotifier),
    /// Log only
    Log(LogNotifier),
}

impl SystemNotifier {
    /// Creates the platform notifier.
    ///
    /// Falls back to [`LogNotifier`] (with a warning) if it cannot start, so
    /// the countdown keeps working without notifications.
    pub async fn new_with_fallback() -> Self {
        #[cfg(target_os = "macos")]
        {
            match NotificationManager::new().await {
                Ok(manager) => return Self::Native(manager),
                Err(e) if e.is_permission_error() => {
                    warn!("⚠️  通知許可が拒否されています。");
                    info!("システム設定 > 通知 で許可してください。");
                }
                Err(e) => {
                    warn!("⚠️  通知システムの初期化に失敗しました: {}", e);
                    info!("{}", e.suggestion());
                }
            }
        }

        #[cfg(all(unix, not(target_os = "macos")))]
        {
            match DesktopNotifier::new() {
                Ok(notifier) => return Self::Desktop(notifier),
                Err(e) => {
                    warn!("⚠️  通知システムの初期化に失敗しました: {}", e);
                }
            }
        }

        Self::Log(LogNotifier)
    }
}

impl Notifier for SystemNotifier {
    async fn post(&self, title: &str, body: &str) -> Result<(), NotificationError> {
        match self {
            #[cfg(target_os = "macos")]
            Self::Native(manager) => manager.post(title, body).await,
            #[cfg(all(unix, not(target_os = "macos")))]
            Self::Desktop(notifier) => notifier.post(title, body).await,
            Self::Log(notifier) => notifier.post(title, body).await,
        }
    }

    async fn cancel_all(&self) {
        match self {
            #[cfg(target_os = "macos")]
            Self::Native(manager) => manager.cancel_all().await,
            #[cfg(all(unix, not(target_os = "macos")))]
            Self::Desktop(notifier) => notifier.cancel_all().await,
            Self::Log(notifier) => notifier.cancel_all().await,
        }
    }

    fn is_available(&self) -> bool {
        match self {
            #[cfg(target_os = "macos")]
            Self::Native(manager) => manager.is_available(),
            #[cfg(all(unix, not(target_os = "macos")))]
            Self::Desktop(notifier) => notifier.is_available(),
            Self::Log(notifier) => notifier.is_available(),
        }
    }
}

// ============================================================================
// MockNotifier
// ============================================================================

#[derive(Debug, Default)]
pub struct MockNotifier {
    posted: Mutex<Vec<(String, String)>>,
    cancel_count: AtomicUsize,
    available: AtomicBool,
    should_fail: AtomicBool,
}

impl MockNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            posted: Mutex::new(Vec::new()),
            cancel_count: AtomicUsize::new(0),
            available: AtomicBool::new(true),
            should_fail: AtomicBool::new(false),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn get_notifications(&self) -> Vec<(String, String)> {
        self.posted.lock().unwrap().clone()
    }

    #[must_use]
    pub fn notification_count(&self) -> usize {
        self.posted.lock().unwrap().len()
    }

    #[must_use]
    pub fn cancel_count(&self) -> usize {
        self.cancel_count.load(Ordering::SeqCst)
    }
}

impl Notifier for MockNotifier {
    async fn post(&self, title: &str, body: &str) -> Result<(), NotificationError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(NotificationError::SendFailed("Mock failure".to_string()));
        }
        self.posted
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }

    async fn cancel_all(&self) {
        self.cancel_count.fetch_add(1, Ordering::SeqCst);
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}
