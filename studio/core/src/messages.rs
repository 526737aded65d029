//! Notices
//!
//! User-facing messages the core emits while it works: validation warnings,
//! export failures, and the like. The presentation layer decides how to show
//! them (a toast, an alert, a line on stderr).

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Notification severity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyLevel {
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
    /// Success
    Success,
}

/// A user-facing notice
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Severity
    pub level: NotifyLevel,
    /// Text to show the user
    pub message: String,
}

impl Notice {
    /// Create a notice
    pub fn new(level: NotifyLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Identifier attached to each generation or export request for log correlation
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new unique request ID
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Optional sending half for notices
///
/// Components hold one of these so they can run with or without a listener.
/// A full or closed channel drops the notice; notices are never allowed to
/// stall an operation.
#[derive(Clone, Debug, Default)]
pub struct Notifier {
    tx: Option<mpsc::Sender<Notice>>,
}

impl Notifier {
    /// A notifier that forwards to `tx`
    #[must_use]
    pub fn new(tx: mpsc::Sender<Notice>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A notifier that discards everything
    #[must_use]
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Send a notice
    pub fn notify(&self, level: NotifyLevel, message: impl Into<String>) {
        let notice = Notice::new(level, message);
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(e) = tx.try_send(notice) {
            tracing::debug!(error = %e, "Dropped notice");
        }
    }
}
