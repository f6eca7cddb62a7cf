//! Subscriber handles and per-subscriber bookkeeping.

use crate::core::Snapshot;
use std::fmt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// Opaque identifier of a registered subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub(crate) u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Live feed of committed snapshots.
///
/// Snapshots arrive in version order. A consumer that falls behind sees
/// gaps, never duplicates. Dropping the handle closes the queue and the
/// store prunes it on the next write; calling
/// [`StateStore::unsubscribe`](super::StateStore::unsubscribe) removes it
/// right away.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    label: String,
    receiver: mpsc::Receiver<Snapshot>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriberId, label: String, receiver: mpsc::Receiver<Snapshot>) -> Self {
        Self {
            id,
            label,
            receiver,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Wait for the next snapshot. Returns `None` once the store side is gone.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }

    /// Take the next queued snapshot without waiting.
    pub fn try_recv(&mut self) -> Option<Snapshot> {
        match self.receiver.try_recv() {
            Ok(snapshot) => Some(snapshot),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Take every queued snapshot without waiting.
    pub fn drain(&mut self) -> Vec<Snapshot> {
        let mut drained = Vec::new();
        while let Some(snapshot) = self.try_recv() {
            drained.push(snapshot);
        }
        drained
    }
}

/// Store-side half of a subscription.
#[derive(Debug)]
pub(crate) struct SubscriberEntry {
    pub(crate) id: SubscriberId,
    pub(crate) label: String,
    pub(crate) capacity: usize,
    pub(crate) sender: mpsc::Sender<Snapshot>,
    pub(crate) delivered: u64,
    pub(crate) missed: u64,
}

/// Delivery counters for one subscriber.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriberStats {
    pub id: SubscriberId,
    pub label: String,
    pub queue_capacity: usize,
    pub delivered: u64,
    pub missed: u64,
}

impl From<&SubscriberEntry> for SubscriberStats {
    fn from(entry: &SubscriberEntry) -> Self {
        Self {
            id: entry.id,
            label: entry.label.clone(),
            queue_capacity: entry.capacity,
            delivered: entry.delivered,
            missed: entry.missed,
        }
    }
}
