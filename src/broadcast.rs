//! Live fan-out of ingested events
//!
//! Each observer owns a bounded queue. Publishing never waits on an observer: a
//! full queue drops the event for that observer only, and a closed queue is
//! logged and left for the transport to detach.

use crate::models::{LiveEvent, LogRecord};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

pub type ObserverId = u64;

/// Delivery counts for one publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub lagging: usize,
    pub closed: usize,
}

/// Registry of live observers keyed by connection id
pub struct BroadcastHub {
    observers: DashMap<ObserverId, mpsc::Sender<Arc<LiveEvent>>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl BroadcastHub {
    /// `buffer` is the per-observer queue depth
    pub fn new(buffer: usize) -> Self {
        Self {
            observers: DashMap::new(),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Register a new observer and return its id and event queue
    pub fn attach(&self) -> (ObserverId, mpsc::Receiver<Arc<LiveEvent>>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.observers.insert(id, tx);

        let count = self.observers.len();
        crate::metrics::set_observers(count);
        tracing::info!(observer_id = id, observers = count, "Observer attached");

        (id, rx)
    }

    /// Like [`attach`](Self::attach), but detaches automatically when the
    /// returned subscription is dropped
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (id, rx) = self.attach();
        Subscription {
            id,
            hub: Arc::clone(self),
            rx,
        }
    }

    /// Remove an observer. Returns false if it was not attached.
    ///
    /// Once this returns, no later publish reaches the observer.
    pub fn detach(&self, id: ObserverId) -> bool {
        let removed = self.observers.remove(&id).is_some();
        if removed {
            let count = self.observers.len();
            crate::metrics::set_observers(count);
            tracing::info!(observer_id = id, observers = count, "Observer detached");
        }
        removed
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Send one event to every attached observer without waiting on any of them
    pub fn publish(&self, topic: &str, record: &LogRecord) -> PublishReport {
        let event = Arc::new(LiveEvent {
            topic: topic.to_string(),
            message: record.clone(),
        });

        let mut report = PublishReport::default();

        for entry in self.observers.iter() {
            match entry.value().try_send(Arc::clone(&event)) {
                Ok(()) => report.delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    report.lagging += 1;
                    tracing::warn!(
                        observer_id = *entry.key(),
                        topic = %topic,
                        "Observer queue full, dropping event"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    report.closed += 1;
                    tracing::debug!(
                        observer_id = *entry.key(),
                        "Observer queue closed, awaiting detach"
                    );
                }
            }
        }

        crate::metrics::record_broadcast(&report);
        report
    }
}

/// An attached observer that detaches itself on drop
///
/// Dropping happens when the transport tears the connection down, which makes
/// deregistration deterministic.
pub struct Subscription {
    id: ObserverId,
    hub: Arc<BroadcastHub>,
    rx: mpsc::Receiver<Arc<LiveEvent>>,
}

impl Subscription {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Next event, or `None` once the hub is gone
    pub async fn recv(&mut self) -> Option<Arc<LiveEvent>> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.detach(self.id);
    }
}
