//! Bounded, time-decaying log of session events.
//!
//! Every push schedules removal of the oldest surviving entry 5000 ms later.
//! One entry is removed per timer regardless of which notification the timer
//! was scheduled for, so under rapid pushes entries can decay out of order
//! relative to their own age. That is the documented policy, not a bug.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use uuid::Uuid;

/// Delay after which a push removes the oldest surviving entry.
pub const NOTIFICATION_TTL_MS: u64 = 5000;

/// Hard cap on queue length; pushing past it drops the oldest immediately.
pub const MAX_NOTIFICATIONS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Warning,
    Error,
    Success,
    System,
    Collaborator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Cloneable handle to the shared notification queue.
///
/// `push` spawns the decay timer on the ambient Tokio runtime, so the queue
/// must only be used from within one.
#[derive(Clone, Default)]
pub struct NotificationQueue {
    entries: Arc<StdMutex<VecDeque<Notification>>>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a notification (id/timestamp assigned here, `read = false`) and
    /// schedule FIFO decay. Identical messages may coexist; there is no
    /// deduplication.
    pub fn push(
        &self,
        kind: NotificationKind,
        message: impl Into<String>,
        source: Option<&str>,
    ) -> Uuid {
        let notification = Notification {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            timestamp: Utc::now(),
            read: false,
            source: source.map(String::from),
        };
        let id = notification.id;

        {
            let mut entries = self.entries.lock().unwrap();
            if entries.len() >= MAX_NOTIFICATIONS {
                entries.pop_front();
            }
            entries.push_back(notification);
        }

        let entries = self.entries.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(NOTIFICATION_TTL_MS)).await;
            if let Some(expired) = entries.lock().unwrap().pop_front() {
                debug!("[notify] Decayed notification {}", expired.id);
            }
        });

        id
    }

    /// Most recent notification, for the single-line status display.
    pub fn latest(&self) -> Option<Notification> {
        self.entries.lock().unwrap().back().cloned()
    }

    /// Snapshot of surviving notifications, oldest first.
    pub fn all(&self) -> Vec<Notification> {
        self.entries.lock().unwrap().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Flip the read flag on one notification. Returns false if it already
    /// decayed.
    pub fn mark_read(&self, id: Uuid) -> bool {
        let mut entries = self.entries.lock().unwrap();
        match entries.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&self) {
        for n in self.entries.lock().unwrap().iter_mut() {
            n.read = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_assigns_id_timestamp_unread() {
        let queue = NotificationQueue::new();
        let id = queue.push(NotificationKind::Info, "hello", None);

        let latest = queue.latest().unwrap();
        assert_eq!(latest.id, id);
        assert_eq!(latest.kind, NotificationKind::Info);
        assert_eq!(latest.message, "hello");
        assert!(!latest.read);
    }

    #[tokio::test]
    async fn test_push_keeps_source() {
        let queue = NotificationQueue::new();
        queue.push(NotificationKind::System, "saved", Some("persistence"));
        assert_eq!(
            queue.latest().unwrap().source.as_deref(),
            Some("persistence")
        );
    }

    #[tokio::test]
    async fn test_identical_messages_coexist() {
        let queue = NotificationQueue::new();
        queue.push(NotificationKind::Info, "same", None);
        queue.push(NotificationKind::Info, "same", None);
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn test_latest_returns_newest() {
        let queue = NotificationQueue::new();
        queue.push(NotificationKind::Info, "first", None);
        queue.push(NotificationKind::Error, "second", None);
        assert_eq!(queue.latest().unwrap().message, "second");
    }

    #[tokio::test]
    async fn test_capacity_bound_drops_oldest() {
        let queue = NotificationQueue::new();
        for i in 0..(MAX_NOTIFICATIONS + 3) {
            queue.push(NotificationKind::Info, format!("n{i}"), None);
        }
        assert_eq!(queue.len(), MAX_NOTIFICATIONS);
        assert_eq!(queue.all()[0].message, "n3");
    }

    #[tokio::test]
    async fn test_mark_read() {
        let queue = NotificationQueue::new();
        let id = queue.push(NotificationKind::Warning, "look", None);

        assert!(queue.mark_read(id));
        assert!(queue.latest().unwrap().read);
        assert!(!queue.mark_read(Uuid::new_v4()));
    }

    #[tokio::test]
    async fn test_mark_all_read() {
        let queue = NotificationQueue::new();
        queue.push(NotificationKind::Info, "a", None);
        queue.push(NotificationKind::Info, "b", None);

        queue.mark_all_read();
        assert!(queue.all().iter().all(|n| n.read));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_notification_decays_after_ttl() {
        let queue = NotificationQueue::new();
        queue.push(NotificationKind::Info, "transient", None);
        tokio::task::yield_now().await;
        assert_eq!(queue.len(), 1);

        tokio::time::sleep(Duration::from_millis(NOTIFICATION_TTL_MS + 10)).await;
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_decays_one_entry_per_timer() {
        let queue = NotificationQueue::new();

        queue.push(NotificationKind::Info, "a", None);
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.push(NotificationKind::Info, "b", None);
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.push(NotificationKind::Info, "c", None);
        tokio::task::yield_now().await;

        // 5005 ms after the first push: only its timer has fired.
        tokio::time::sleep(Duration::from_millis(NOTIFICATION_TTL_MS - 15)).await;
        let survivors: Vec<String> = queue.all().into_iter().map(|n| n.message).collect();
        assert_eq!(survivors, vec!["b", "c"]);

        // All timers fired: queue drains.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(queue.is_empty());
    }
}
