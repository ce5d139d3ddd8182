//! User-facing side effects of a submission: toasts and navigation.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::NotificationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A timed toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    /// Time on screen
    pub display: Duration,
    /// Time on screen after the pointer leaves it
    pub extended: Duration,
}

impl Notification {
    pub fn success(message: impl Into<String>, config: &NotificationConfig) -> Self {
        Self::timed(NotificationLevel::Success, message, config)
    }

    pub fn error(message: impl Into<String>, config: &NotificationConfig) -> Self {
        Self::timed(NotificationLevel::Error, message, config)
    }

    fn timed(level: NotificationLevel, message: impl Into<String>, config: &NotificationConfig) -> Self {
        Self {
            level,
            message: message.into(),
            display: Duration::from_millis(config.display_ms),
            extended: Duration::from_millis(config.extended_ms),
        }
    }
}

/// Displays notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Moves the UI to another route.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Forwards notifications to a receiver owned by the UI layer.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            tracing::warn!("Notification receiver dropped");
        }
    }
}

pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelNavigator {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, route: &str) {
        if self.tx.send(route.to_string()).is_err() {
            tracing::warn!(route, "Navigation receiver dropped");
        }
    }
}
