//! Notification request creation.

use objc2::rc::Retained;
use objc2_foundation::NSString;
use objc2_user_notifications::{
    UNMutableNotificationContent, UNNotificationRequest, UNNotificationTrigger,
    UNTimeIntervalNotificationTrigger,
};
use uuid::Uuid;

/// Creates a request delivered immediately under a fresh identifier.
#[must_use]
pub fn create_notification_request(
    content: &UNMutableNotificationContent,
) -> Retained<UNNotificationRequest> {
    let identifier = NSString::from_str(&Uuid::new_v4().to_string());

    UNNotificationRequest::requestWithIdentifier_content_trigger(&identifier, content, None)
}

/// Creates a request the system delivers after `delay_secs`, even if this
/// process is no longer running.
///
/// `delay_secs` must be positive.
#[must_use]
pub fn create_scheduled_request(
    identifier: &str,
    content: &UNMutableNotificationContent,
    delay_secs: f64,
) -> Retained<UNNotificationRequest> {
    let identifier = NSString::from_str(identifier);
    let trigger =
        unsafe { UNTimeIntervalNotificationTrigger::triggerWithTimeInterval_repeats(delay_secs, false) };
    let trigger: &UNNotificationTrigger = &trigger;

    UNNotificationRequest::requestWithIdentifier_content_trigger(&identifier, content, Some(trigger))
}
