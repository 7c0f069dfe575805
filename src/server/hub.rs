//! Subscriber registry and snapshot fan-out.
//!
//! Every connected display owns an unbounded queue drained by its socket
//! writer task. The hub only enqueues, so a slow or dead socket never
//! blocks delivery to the others.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

use crate::store::Snapshot;

/// Identifier handed out by [`BroadcastHub::register`].
pub type SubscriberId = u64;

/// Sending half of a subscriber's message queue.
pub type Outbox = mpsc::UnboundedSender<Arc<str>>;

/// Receiving half, drained by the connection's writer task.
pub type Inbox = mpsc::UnboundedReceiver<Arc<str>>;

/// Creates a queue for a new subscriber.
pub fn outbox() -> (Outbox, Inbox) {
    mpsc::unbounded_channel()
}

struct Subscriber {
    tx: Outbox,
    last_version: Option<u64>,
}

enum Delivery {
    Sent,
    Stale,
    Closed,
}

impl Subscriber {
    fn offer(&mut self, version: u64, payload: &Arc<str>) -> Delivery {
        if self.last_version.is_some_and(|last| version <= last) {
            return Delivery::Stale;
        }
        if self.tx.send(Arc::clone(payload)).is_err() {
            return Delivery::Closed;
        }
        self.last_version = Some(version);
        Delivery::Sent
    }
}

/// Outcome of a single [`BroadcastHub::broadcast`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers the snapshot was queued for.
    pub delivered: usize,
    /// Subscribers found closed and pruned.
    pub dropped: usize,
    /// Subscribers that already had a newer snapshot.
    pub stale: usize,
}

/// Registry of connected displays.
#[derive(Default)]
pub struct BroadcastHub {
    subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,
    next_id: AtomicU64,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriberId, Subscriber>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn encode(snapshot: &Snapshot) -> Option<Arc<str>> {
        match serde_json::to_string(&snapshot.state) {
            Ok(json) => Some(Arc::from(json)),
            Err(e) => {
                tracing::error!(?e, version = snapshot.version, "Failed to serialize state");
                None
            }
        }
    }

    /// Adds a subscriber. Nothing is sent until [`push_one`](Self::push_one)
    /// or the next broadcast.
    pub fn register(&self, tx: Outbox) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(
            id,
            Subscriber {
                tx,
                last_version: None,
            },
        );
        tracing::debug!(subscriber = id, "Subscriber registered");
        id
    }

    /// Removes a subscriber. Returns false if it was already gone.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            tracing::debug!(subscriber = id, "Subscriber unregistered");
        }
        removed
    }

    /// Queues `snapshot` for one subscriber.
    ///
    /// Returns false if the subscriber is unknown, closed, or already has a
    /// newer snapshot queued.
    pub fn push_one(&self, id: SubscriberId, snapshot: &Snapshot) -> bool {
        let Some(payload) = Self::encode(snapshot) else {
            return false;
        };

        let mut subscribers = self.lock();
        let Some(sub) = subscribers.get_mut(&id) else {
            return false;
        };

        match sub.offer(snapshot.version, &payload) {
            Delivery::Sent => true,
            Delivery::Stale => false,
            Delivery::Closed => {
                subscribers.remove(&id);
                false
            }
        }
    }

    /// Queues `snapshot` for every open subscriber, pruning closed ones.
    pub fn broadcast(&self, snapshot: &Snapshot) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let Some(payload) = Self::encode(snapshot) else {
            return report;
        };

        self.lock().retain(|id, sub| match sub.offer(snapshot.version, &payload) {
            Delivery::Sent => {
                report.delivered += 1;
                true
            }
            Delivery::Stale => {
                report.stale += 1;
                true
            }
            Delivery::Closed => {
                tracing::debug!(subscriber = *id, "Pruning closed subscriber");
                report.dropped += 1;
                false
            }
        });

        report
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }
}
