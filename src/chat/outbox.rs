//! Per-connection outgoing event queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::{mpsc, Notify};

use super::error::ChatError;
use super::events::ServerEvent;
use super::registry::Departure;

/// Receiving half drained by the transport writer.
pub type OutboxReceiver = mpsc::Receiver<Arc<ServerEvent>>;

/// Why an event could not be queued.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// The client is not keeping up.
    #[error("outbox full")]
    Full,
    /// The transport is gone.
    #[error("outbox closed")]
    Closed,
}

impl From<DeliveryError> for ChatError {
    fn from(_: DeliveryError) -> Self {
        ChatError::DeliveryFailure
    }
}

#[derive(Debug, Default)]
struct Eviction {
    evicted: AtomicBool,
    signal: Notify,
    departure: Mutex<Option<Departure>>,
}

/// Bounded, non-blocking sender of events to one connection.
///
/// Delivery never waits. A connection whose queue fills up is evicted by
/// the broadcaster; the eviction is recorded here so the transport can hang
/// up and the session can finish its close.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::Sender<Arc<ServerEvent>>,
    eviction: Arc<Eviction>,
}

impl Outbox {
    /// Create an outbox and the receiver for its transport.
    pub fn channel(capacity: usize) -> (Self, OutboxReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let outbox = Self {
            tx,
            eviction: Arc::default(),
        };
        (outbox, rx)
    }

    /// Queue an event.
    pub fn deliver(&self, event: Arc<ServerEvent>) -> Result<(), DeliveryError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Whether the receiving side is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Mark the connection evicted, keeping what it held in the registry.
    pub(super) fn evict(&self, departure: Departure) {
        if let Ok(mut slot) = self.eviction.departure.lock() {
            *slot = Some(departure);
        }
        self.eviction.evicted.store(true, Ordering::Release);
        self.eviction.signal.notify_one();
    }

    /// Take the registry state recorded at eviction, once.
    pub(super) fn take_eviction(&self) -> Option<Departure> {
        self.eviction.departure.lock().ok()?.take()
    }

    /// Whether the connection has been evicted.
    pub fn is_evicted(&self) -> bool {
        self.eviction.evicted.load(Ordering::Acquire)
    }

    /// A handle the transport can wait on for eviction.
    pub fn eviction_signal(&self) -> EvictionSignal {
        EvictionSignal(self.eviction.clone())
    }
}

/// Resolves once the connection has been evicted.
#[derive(Debug, Clone)]
pub struct EvictionSignal(Arc<Eviction>);

impl EvictionSignal {
    /// Wait for eviction.
    pub async fn wait(&self) {
        if self.0.evicted.load(Ordering::Acquire) {
            return;
        }
        self.0.signal.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_deliver_and_receive() {
        let (outbox, mut rx) = Outbox::channel(4);
        outbox.deliver(Arc::new(ServerEvent::Pong)).unwrap();
        assert_eq!(*rx.recv().await.unwrap(), ServerEvent::Pong);
    }

    #[tokio::test]
    async fn test_full_queue_fails_without_blocking() {
        let (outbox, _rx) = Outbox::channel(1);
        outbox.deliver(Arc::new(ServerEvent::Pong)).unwrap();
        assert_eq!(
            outbox.deliver(Arc::new(ServerEvent::Pong)),
            Err(DeliveryError::Full)
        );
    }

    #[tokio::test]
    async fn test_closed_queue_fails() {
        let (outbox, rx) = Outbox::channel(4);
        drop(rx);
        assert!(outbox.is_closed());
        assert_eq!(
            outbox.deliver(Arc::new(ServerEvent::Pong)),
            Err(DeliveryError::Closed)
        );
    }

    #[tokio::test]
    async fn test_eviction_wakes_waiter_once() {
        let (outbox, _rx) = Outbox::channel(4);
        let signal = outbox.eviction_signal();
        assert!(!outbox.is_evicted());

        let waiter = tokio::spawn(async move { signal.wait().await });
        outbox.evict(Departure {
            identity: None,
            rooms: vec![3],
        });

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(outbox.is_evicted());
        assert_eq!(outbox.take_eviction().unwrap().rooms, vec![3]);
        assert!(outbox.take_eviction().is_none());

        // waiting after the fact resolves immediately
        outbox.eviction_signal().wait().await;
    }
}
