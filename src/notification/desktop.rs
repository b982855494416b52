//! Freedesktop notifications for Linux and the BSDs.
//!
//! D-Bus calls block, so they run on one dedicated worker thread. The worker
//! also keeps the handles of shown notifications so they can be closed later;
//! handles never leave that thread.

use std::sync::mpsc as std_mpsc;
use std::thread;

use notify_rust::{Notification, NotificationHandle, Urgency};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::error::NotificationError;
use super::text::sanitize_or;
use super::Notifier;

/// Application name reported to the notification server.
const APP_NAME: &str = "countdown";

/// Icon name from the freedesktop icon theme.
const ICON_NAME: &str = "alarm-clock";

enum Job {
    Post {
        title: String,
        body: String,
        reply: oneshot::Sender<Result<(), NotificationError>>,
    },
    CloseAll,
}

/// Posts notifications through the desktop notification server.
pub struct DesktopNotifier {
    jobs: std_mpsc::Sender<Job>,
}

impl DesktopNotifier {
    /// Starts the notification worker thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be spawned.
    pub fn new() -> Result<Self, NotificationError> {
        let (jobs, rx) = std_mpsc::channel::<Job>();

        thread::Builder::new()
            .name("countdown-notify".to_string())
            .spawn(move || run_worker(rx))
            .map_err(|e| NotificationError::InitializationFailed(e.to_string()))?;

        Ok(Self { jobs })
    }
}

fn run_worker(rx: std_mpsc::Receiver<Job>) {
    let mut shown: Vec<NotificationHandle> = Vec::new();

    while let Ok(job) = rx.recv() {
        match job {
            Job::Post { title, body, reply } => {
                let result = Notification::new()
                    .summary(&title)
                    .body(&body)
                    .appname(APP_NAME)
                    .icon(ICON_NAME)
                    .urgency(Urgency::Critical)
                    .show();

                let outcome = match result {
                    Ok(handle) => {
                        debug!("通知を表示しました: id={}", handle.id());
                        shown.push(handle);
                        Ok(())
                    }
                    Err(e) => Err(NotificationError::SendFailed(e.to_string())),
                };
                let _ = reply.send(outcome);
            }
            Job::CloseAll => {
                for handle in shown.drain(..) {
                    handle.close();
                }
            }
        }
    }
}

impl Notifier for DesktopNotifier {
    async fn post(&self, title: &str, body: &str) -> Result<(), NotificationError> {
        let (reply, rx) = oneshot::channel();
        self.jobs
            .send(Job::Post {
                title: sanitize_or(title, "Countdown"),
                body: sanitize_or(body, "Time is up"),
                reply,
            })
            .map_err(|_| NotificationError::NotAvailable)?;

        rx.await.map_err(|_| NotificationError::NotAvailable)?
    }

    async fn cancel_all(&self) {
        if self.jobs.send(Job::CloseAll).is_err() {
            warn!("通知ワーカーが停止しています");
        }
    }

    fn is_available(&self) -> bool {
        true
    }
}
