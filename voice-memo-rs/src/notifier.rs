//! Desktop notifications via notify-rust (D-Bus).

use notify_rust::Notification;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct Notifier {
    enabled: bool,
}

impl Notifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Show a notification off the async workers; the D-Bus call blocks.
    ///
    /// Returns the blocking task, or `None` when notifications are off.
    pub fn notify(&self, summary: &str, body: &str) -> Option<JoinHandle<()>> {
        if !self.enabled {
            return None;
        }

        debug!("Notification: {summary}");

        let summary = summary.to_string();
        let body = body.to_string();
        Some(tokio::task::spawn_blocking(move || {
            if let Err(e) = Notification::new()
                .summary(&summary)
                .body(&body)
                .icon("appointment-soon")
                .timeout(10_000)
                .show()
            {
                warn!("Failed to show notification: {e}");
            }
        }))
    }
}
