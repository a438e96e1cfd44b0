// ── Session notification center ──
//
// In-memory list of toasts and banners. Never persisted. Consumers
// subscribe to the snapshot and render it however they like.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{Display, EnumString};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use uuid::Uuid;

use crate::error::CoreError;

/// Notifications kept before the oldest are dropped.
const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

/// How a consumer should surface a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Placement {
    /// Transient popup.
    Toast,
    /// Sticky until dismissed.
    Banner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub placement: Placement,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Machine code for error notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            placement: Placement::Toast,
            title: title.into(),
            message: message.into(),
            description: None,
            code: None,
            read: false,
            created_at: Utc::now(),
        }
    }

    pub fn banner(mut self) -> Self {
        self.placement = Placement::Banner;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Error toast built from the normalized `{message, code}` form.
    pub fn from_error(title: impl Into<String>, err: &CoreError) -> Self {
        let notice = err.notice();
        let mut n = Self::new(NotificationKind::Error, title, notice.message);
        n.code = Some(notice.code);
        n
    }
}

/// Shared handle to the notification list. Clones see the same list.
#[derive(Clone)]
pub struct NotificationCenter {
    items: Arc<watch::Sender<Arc<Vec<Notification>>>>,
    capacity: usize,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (items, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            items: Arc::new(items),
            capacity: capacity.max(1),
        }
    }

    // ── Push ─────────────────────────────────────────────────────────

    /// Newest first. Drops the oldest past capacity.
    pub fn push(&self, notification: Notification) -> Uuid {
        let id = notification.id;
        tracing::debug!(kind = %notification.kind, title = %notification.title, "notification");
        self.modify(|items| {
            items.insert(0, notification);
            items.truncate(self.capacity);
            true
        });
        id
    }

    pub fn info(&self, title: impl Into<String>, message: impl Into<String>) -> Uuid {
        self.push(Notification::new(NotificationKind::Info, title, message))
    }

    pub fn success(&self, title: impl Into<String>, message: impl Into<String>) -> Uuid {
        self.push(Notification::new(NotificationKind::Success, title, message))
    }

    pub fn warning(&self, title: impl Into<String>, message: impl Into<String>) -> Uuid {
        self.push(Notification::new(NotificationKind::Warning, title, message))
    }

    pub fn error(&self, title: impl Into<String>, err: &CoreError) -> Uuid {
        self.push(Notification::from_error(title, err))
    }

    // ── State changes ────────────────────────────────────────────────

    pub fn mark_read(&self, id: Uuid) -> bool {
        self.modify(|items| {
            items
                .iter_mut()
                .find(|n| n.id == id && !n.read)
                .map(|n| n.read = true)
                .is_some()
        })
    }

    pub fn mark_all_read(&self) {
        self.modify(|items| {
            let mut changed = false;
            for n in items.iter_mut().filter(|n| !n.read) {
                n.read = true;
                changed = true;
            }
            changed
        });
    }

    pub fn dismiss(&self, id: Uuid) -> bool {
        self.modify(|items| {
            let before = items.len();
            items.retain(|n| n.id != id);
            items.len() != before
        })
    }

    pub fn clear(&self) {
        self.modify(|items| {
            let had_any = !items.is_empty();
            items.clear();
            had_any
        });
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<Vec<Notification>> {
        self.items.borrow().clone()
    }

    pub fn unread_count(&self) -> usize {
        self.items.borrow().iter().filter(|n| !n.read).count()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Notification>>> {
        self.items.subscribe()
    }

    /// Snapshot stream, starting with the current list.
    pub fn stream(&self) -> WatchStream<Arc<Vec<Notification>>> {
        WatchStream::new(self.subscribe())
    }

    fn modify(&self, f: impl FnOnce(&mut Vec<Notification>) -> bool) -> bool {
        self.items.send_if_modified(|items| f(Arc::make_mut(items)))
    }
}
