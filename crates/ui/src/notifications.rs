//! Transient user-facing messages.
//!
//! Each notification gets a UUID and is removed by that id, either by the
//! user or by a timer once its time-to-live runs out. Position in the list is
//! never used to address an entry, so expiring one leaves the others alone.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct NotificationId(pub Uuid);

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub severity: Severity,
}

type Entries = Arc<Mutex<Vec<Notification>>>;

pub struct NotificationCenter {
    entries: Entries,
    ttl: Duration,
}

impl NotificationCenter {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: Arc::new(Mutex::new(Vec::new())), ttl }
    }

    /// Adds a notification and schedules its removal after the configured
    /// time-to-live. Outside a tokio runtime the entry stays until dismissed
    /// or drained.
    pub fn notify(&self, message: impl Into<String>, severity: Severity) -> NotificationId {
        let notification =
            Notification { id: NotificationId(Uuid::new_v4()), message: message.into(), severity };
        let id = notification.id;

        match severity {
            Severity::Error => error!(event_name = "desk.notify", severity = %severity, message = %notification.message, "notification raised"),
            Severity::Warning => warn!(event_name = "desk.notify", severity = %severity, message = %notification.message, "notification raised"),
            Severity::Success | Severity::Info => info!(event_name = "desk.notify", severity = %severity, message = %notification.message, "notification raised"),
        }

        lock(&self.entries).push(notification);

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let entries = Arc::downgrade(&self.entries);
            let ttl = self.ttl;
            runtime.spawn(async move {
                tokio::time::sleep(ttl).await;
                expire(&entries, id);
            });
        }

        id
    }

    pub fn success(&self, message: impl Into<String>) -> NotificationId {
        self.notify(message, Severity::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> NotificationId {
        self.notify(message, Severity::Error)
    }

    pub fn warning(&self, message: impl Into<String>) -> NotificationId {
        self.notify(message, Severity::Warning)
    }

    pub fn info(&self, message: impl Into<String>) -> NotificationId {
        self.notify(message, Severity::Info)
    }

    /// Removes a notification before it expires. Returns `false` if it was
    /// already gone.
    pub fn dismiss(&self, id: NotificationId) -> bool {
        remove(&mut lock(&self.entries), id)
    }

    pub fn active(&self) -> Vec<Notification> {
        lock(&self.entries).clone()
    }

    /// Takes every active notification, leaving the area empty.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *lock(&self.entries))
    }
}

fn lock(entries: &Mutex<Vec<Notification>>) -> std::sync::MutexGuard<'_, Vec<Notification>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

fn remove(entries: &mut Vec<Notification>, id: NotificationId) -> bool {
    let before = entries.len();
    entries.retain(|notification| notification.id != id);
    entries.len() != before
}

fn expire(entries: &Weak<Mutex<Vec<Notification>>>, id: NotificationId) {
    if let Some(entries) = entries.upgrade() {
        remove(&mut lock(&entries), id);
    }
}
