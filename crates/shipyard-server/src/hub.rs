//! In-memory fan-out of live task output.
//!
//! Each task has its own subscriber set behind its own lock; the map of sets
//! is only held long enough to find or insert an entry. Delivery uses
//! `try_send` on a bounded channel per subscriber, so a full or closed
//! subscriber is dropped instead of stalling the publisher.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shipyard_core::types::{TaskId, TaskStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use crate::log_sink::LogLine;

/// Terminal marker for a task; always the last message a subscriber sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub status: TaskStatus,
    pub exit_code: Option<i32>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskMessage {
    Line(LogLine),
    Completed(CompletionEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub task_id: TaskId,
    id: u64,
}

type SubscriberSet = HashMap<u64, mpsc::Sender<TaskMessage>>;

struct HubInner {
    tasks: RwLock<HashMap<TaskId, Arc<Mutex<SubscriberSet>>>>,
    next_id: AtomicU64,
    buffer: usize,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl HubInner {
    fn unsubscribe(&self, handle: SubscriptionHandle) {
        let mut tasks = self
            .tasks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(set) = tasks.get(&handle.task_id) else {
            return;
        };
        let now_empty = {
            let mut set = lock(set);
            set.remove(&handle.id);
            set.is_empty()
        };
        if now_empty {
            tasks.remove(&handle.task_id);
        }
    }

    fn set_for(&self, task_id: TaskId) -> Option<Arc<Mutex<SubscriberSet>>> {
        self.tasks
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&task_id)
            .cloned()
    }
}

#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl BroadcastHub {
    /// `buffer` is how many undelivered messages a subscriber may hold before
    /// it is considered too slow and dropped.
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                tasks: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Register a live subscriber for `task_id`. Never fails: a task with no
    /// running publisher simply never delivers anything.
    pub fn subscribe(&self, task_id: TaskId) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut tasks = self
                .inner
                .tasks
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let set = tasks.entry(task_id).or_default();
            lock(set).insert(id, tx);
        }
        debug!(task_id = %task_id, subscriber = id, "subscribed");
        Subscription {
            handle: SubscriptionHandle { task_id, id },
            rx,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Idempotent; unknown handles are ignored.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.inner.unsubscribe(handle);
    }

    /// Deliver `msg` to every current subscriber of `task_id` without waiting.
    /// Returns how many subscribers accepted it.
    pub fn publish(&self, task_id: TaskId, msg: TaskMessage) -> usize {
        let Some(set) = self.inner.set_for(task_id) else {
            return 0;
        };
        let mut set = lock(&set);
        let mut delivered = 0;
        set.retain(|id, tx| match tx.try_send(msg.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!(task_id = %task_id, subscriber = id, "dropping slow subscriber");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(task_id = %task_id, subscriber = id, "dropping disconnected subscriber");
                false
            }
        });
        delivered
    }

    /// Forget every subscriber of a finished task. Their receivers then end.
    pub fn close(&self, task_id: TaskId) {
        let removed = self
            .inner
            .tasks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&task_id);
        if let Some(set) = removed {
            lock(&set).clear();
        }
    }

    pub fn subscriber_count(&self, task_id: TaskId) -> usize {
        self.inner
            .set_for(task_id)
            .map(|set| lock(&set).len())
            .unwrap_or(0)
    }
}

/// A live subscription. Dropping it unsubscribes.
pub struct Subscription {
    handle: SubscriptionHandle,
    rx: mpsc::Receiver<TaskMessage>,
    hub: Weak<HubInner>,
}

impl Subscription {
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle
    }

    /// Next message, or `None` once the task closed or this subscriber was
    /// dropped for falling behind.
    pub async fn recv(&mut self) -> Option<TaskMessage> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn line(seq: u64, text: &str) -> TaskMessage {
        TaskMessage::Line(LogLine {
            seq,
            text: text.to_string(),
        })
    }

    fn completed() -> TaskMessage {
        TaskMessage::Completed(CompletionEvent {
            status: TaskStatus::Succeeded,
            exit_code: Some(0),
            completed_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn fan_out_reaches_every_subscriber_in_order() {
        let hub = BroadcastHub::new(16);
        let task = TaskId::new();
        let mut a = hub.subscribe(task);
        let mut b = hub.subscribe(task);

        assert_eq!(hub.publish(task, line(1, "one")), 2);
        assert_eq!(hub.publish(task, line(2, "two")), 2);
        assert_eq!(hub.publish(task, completed()), 2);

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.recv().await, Some(line(1, "one")));
            assert_eq!(sub.recv().await, Some(line(2, "two")));
            assert!(matches!(sub.recv().await, Some(TaskMessage::Completed(_))));
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_discarded() {
        let hub = BroadcastHub::new(16);
        let task = TaskId::new();
        assert_eq!(hub.publish(task, line(1, "lost")), 0);

        // A later subscriber gets no replay.
        let mut late = hub.subscribe(task);
        hub.publish(task, line(2, "seen"));
        assert_eq!(late.recv().await, Some(line(2, "seen")));
    }

    #[tokio::test]
    async fn slow_subscriber_is_dropped_others_unaffected() {
        let hub = BroadcastHub::new(2);
        let task = TaskId::new();
        let slow = hub.subscribe(task);
        let mut fast = hub.subscribe(task);

        let mut fast_seen = Vec::new();
        for seq in 1..=5 {
            hub.publish(task, line(seq, "x"));
            if let Some(TaskMessage::Line(l)) = fast.recv().await {
                fast_seen.push(l.seq);
            }
        }
        assert_eq!(fast_seen, vec![1, 2, 3, 4, 5]);
        assert_eq!(hub.subscriber_count(task), 1);
        drop(slow);
    }

    #[tokio::test]
    async fn dropped_slow_subscriber_sees_end_of_stream() {
        let hub = BroadcastHub::new(1);
        let task = TaskId::new();
        let mut slow = hub.subscribe(task);
        hub.publish(task, line(1, "kept"));
        hub.publish(task, line(2, "overflow"));

        assert_eq!(slow.recv().await, Some(line(1, "kept")));
        assert_eq!(slow.recv().await, None);
    }

    #[tokio::test]
    async fn leaked_subscription_can_be_removed_by_handle() {
        let hub = BroadcastHub::new(4);
        let task = TaskId::new();
        let sub = hub.subscribe(task);
        let handle = sub.handle();
        // Simulate a vanished connection without running Drop.
        std::mem::forget(sub);
        assert_eq!(hub.subscriber_count(task), 1);
        hub.unsubscribe(handle);
        assert_eq!(hub.subscriber_count(task), 0);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let hub = BroadcastHub::new(4);
        let task = TaskId::new();
        let sub = hub.subscribe(task);
        let handle = sub.handle();

        hub.unsubscribe(handle);
        hub.unsubscribe(handle);
        assert_eq!(hub.subscriber_count(task), 0);

        // Unknown handle from another hub.
        let other = BroadcastHub::new(4).subscribe(TaskId::new()).handle();
        hub.unsubscribe(other);

        // Drop after explicit unsubscribe is also a no-op.
        drop(sub);
    }

    #[tokio::test]
    async fn drop_unsubscribes() {
        let hub = BroadcastHub::new(4);
        let task = TaskId::new();
        let sub = hub.subscribe(task);
        assert_eq!(hub.subscriber_count(task), 1);
        drop(sub);
        assert_eq!(hub.subscriber_count(task), 0);
    }

    #[tokio::test]
    async fn close_ends_receivers_and_late_subscribers_get_nothing() {
        let hub = BroadcastHub::new(4);
        let task = TaskId::new();
        let mut early = hub.subscribe(task);
        hub.publish(task, completed());
        hub.close(task);

        assert!(matches!(early.recv().await, Some(TaskMessage::Completed(_))));
        assert_eq!(early.recv().await, None);

        let mut late = hub.subscribe(task);
        let got = tokio::time::timeout(Duration::from_millis(50), late.recv()).await;
        assert!(got.is_err(), "late subscriber must not receive anything");
    }

    #[tokio::test]
    async fn blocked_subscriber_on_one_task_does_not_affect_another() {
        let hub = BroadcastHub::new(1);
        let (a, b) = (TaskId::new(), TaskId::new());
        let _stuck = hub.subscribe(a);
        let mut other = hub.subscribe(b);

        for seq in 1..=10 {
            hub.publish(a, line(seq, "a"));
            assert_eq!(hub.publish(b, line(seq, "b")), 1);
            assert_eq!(other.recv().await, Some(line(seq, "b")));
        }
    }
}
