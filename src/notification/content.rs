//! Notification content construction.
//!
//! This module provides a builder for creating notification content
//! with type-safe fluent API.

use objc2::rc::Retained;
use objc2_foundation::NSString;
use objc2_user_notifications::{UNMutableNotificationContent, UNNotificationSound};

use super::text::sanitize_or;

/// Category identifier attached to countdown notifications.
pub const COUNTDOWN_CATEGORY: &str = "COUNTDOWN_COMPLETE";

/// Builder for constructing notification content.
///
/// Provides a fluent API for setting notification properties.
pub struct NotificationContentBuilder {
    content: Retained<UNMutableNotificationContent>,
}

impl NotificationContentBuilder {
    /// Creates a new notification content builder.
    #[must_use]
    pub fn new() -> Self {
        let content = unsafe { UNMutableNotificationContent::new() };
        Self { content }
    }

    /// Sets the notification title.
    #[must_use]
    pub fn title(self, title: &str) -> Self {
        let title = NSString::from_str(title);
        unsafe {
            self.content.setTitle(&title);
        }
        self
    }

    /// Sets the notification body text.
    #[must_use]
    pub fn body(self, body: &str) -> Self {
        let body = NSString::from_str(body);
        unsafe {
            self.content.setBody(&body);
        }
        self
    }

    /// Sets the category identifier.
    #[must_use]
    pub fn category_identifier(self, category_id: &str) -> Self {
        let category_id = NSString::from_str(category_id);
        unsafe {
            self.content.setCategoryIdentifier(&category_id);
        }
        self
    }

    /// Sets the default system sound.
    #[must_use]
    pub fn default_sound(self) -> Self {
        let sound = unsafe { UNNotificationSound::defaultSound() };
        unsafe {
            self.content.setSound(Some(&sound));
        }
        self
    }

    /// Builds and returns the notification content.
    #[must_use]
    pub fn build(self) -> Retained<UNMutableNotificationContent> {
        self.content
    }
}

impl Default for NotificationContentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates the content shown when a countdown reaches zero.
#[must_use]
pub fn create_completion_content(title: &str, body: &str) -> Retained<UNMutableNotificationContent> {
    NotificationContentBuilder::new()
        .title(&sanitize_or(title, "Countdown"))
        .body(&sanitize_or(body, "Time is up"))
        .category_identifier(COUNTDOWN_CATEGORY)
        .default_sound()
        .build()
}
