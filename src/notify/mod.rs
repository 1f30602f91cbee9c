use log::debug;
use tokio::sync::mpsc;

/// Toast severity, mirrored by the UI's styling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// One transient UI toast. A duration of 0 keeps it on screen until the
/// user dismisses it.
#[derive(Clone, Debug)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub duration_ms: u64,
}

impl Default for Notification {
    fn default() -> Self {
        Notification {
            severity: Severity::Info,
            title: "info".to_owned(),
            message: "no further information provided".to_owned(),
            duration_ms: 0,
        }
    }
}

impl Notification {
    pub fn info(title: &str, message: &str) -> Self {
        Notification {
            severity: Severity::Info,
            title: title.to_owned(),
            message: message.to_owned(),
            ..Default::default()
        }
    }

    /// Success toasts auto-dismiss; nobody needs to close "it worked".
    pub fn success(title: &str, message: &str) -> Self {
        Notification {
            severity: Severity::Success,
            title: title.to_owned(),
            message: message.to_owned(),
            duration_ms: 5_000,
        }
    }

    /// Error toasts persist until dismissed.
    pub fn error(title: &str, message: &str) -> Self {
        Notification {
            severity: Severity::Error,
            title: title.to_owned(),
            message: message.to_owned(),
            duration_ms: 0,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// Fire-and-forget handle to the toast surface. Cloneable; if the surface
/// is gone, notifications are silently dropped.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Notifier { tx }, rx)
    }

    pub fn send(&self, notification: Notification) {
        debug!(
            "toast [{:?}] {}: {}",
            notification.severity, notification.title, notification.message
        );
        self.tx.send(notification).ok();
    }
}
