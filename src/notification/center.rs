//! UNUserNotificationCenter wrapper.

use std::cell::RefCell;
use std::ptr::NonNull;

use block2::RcBlock;
use objc2::rc::Retained;
use objc2::runtime::Bool;
use objc2_foundation::{NSArray, NSError, NSString};
use objc2_user_notifications::{
    UNAuthorizationOptions, UNAuthorizationStatus, UNNotificationRequest, UNNotificationSettings,
    UNUserNotificationCenter,
};
use tokio::sync::oneshot;

use super::error::NotificationError;

pub struct NotificationCenter;

impl NotificationCenter {
    #[must_use]
    pub fn current() -> Retained<UNUserNotificationCenter> {
        UNUserNotificationCenter::currentNotificationCenter()
    }

    pub async fn request_authorization() -> Result<bool, NotificationError> {
        let (tx, rx) = oneshot::channel::<Result<bool, NotificationError>>();

        let options = UNAuthorizationOptions::Alert | UNAuthorizationOptions::Sound;

        let cb = RefCell::new(Some(tx));
        let block = RcBlock::new(move |granted: Bool, error: *mut NSError| {
            if let Some(sender) = cb.borrow_mut().take() {
                let result = match unsafe { error.as_ref() } {
                    Some(err_ref) => Err(NotificationError::AuthorizationFailed(
                        err_ref.localizedDescription().to_string(),
                    )),
                    None => Ok(granted.as_bool()),
                };
                let _ = sender.send(result);
            }
        });

        Self::current().requestAuthorizationWithOptions_completionHandler(options, &block);

        rx.await
            .map_err(|_| NotificationError::InitializationFailed("Channel closed".to_string()))?
    }

    pub async fn get_authorization_status() -> Result<UNAuthorizationStatus, NotificationError> {
        let (tx, rx) = oneshot::channel::<UNAuthorizationStatus>();

        let cb = RefCell::new(Some(tx));
        let block = RcBlock::new(move |settings: NonNull<UNNotificationSettings>| {
            if let Some(sender) = cb.borrow_mut().take() {
                let status = unsafe { settings.as_ref().authorizationStatus() };
                let _ = sender.send(status);
            }
        });

        Self::current().getNotificationSettingsWithCompletionHandler(&block);

        rx.await
            .map_err(|_| NotificationError::InitializationFailed("Channel closed".to_string()))
    }

    pub async fn is_authorized() -> Result<bool, NotificationError> {
        let status = Self::get_authorization_status().await?;
        Ok(matches!(
            status,
            UNAuthorizationStatus::Authorized
                | UNAuthorizationStatus::Provisional
                | UNAuthorizationStatus::Ephemeral
        ))
    }

    pub async fn add_notification_request(
        request: &UNNotificationRequest,
    ) -> Result<(), NotificationError> {
        let (tx, rx) = oneshot::channel::<Result<(), NotificationError>>();

        let cb = RefCell::new(Some(tx));
        let block = RcBlock::new(move |error: *mut NSError| {
            if let Some(sender) = cb.borrow_mut().take() {
                let result = match unsafe { error.as_ref() } {
                    Some(err_ref) => Err(NotificationError::SendFailed(
                        err_ref.localizedDescription().to_string(),
                    )),
                    None => Ok(()),
                };
                let _ = sender.send(result);
            }
        });

        Self::current().addNotificationRequest_withCompletionHandler(request, Some(&block));

        rx.await
            .map_err(|_| NotificationError::SendFailed("Channel closed".to_string()))?
    }

    /// Removes a pending or already delivered request by identifier.
    pub fn remove_notification(identifier: &str) {
        let identifier = NSString::from_str(identifier);
        let identifiers = NSArray::from_slice(&[&*identifier]);
        let center = Self::current();

        center.removePendingNotificationRequestsWithIdentifiers(&identifiers);
        center.removeDeliveredNotificationsWithIdentifiers(&identifiers);
    }

    pub fn remove_all_pending_notifications() {
        Self::current().removeAllPendingNotificationRequests();
    }

    pub fn remove_all_delivered_notifications() {
        Self::current().removeAllDeliveredNotifications();
    }
}
