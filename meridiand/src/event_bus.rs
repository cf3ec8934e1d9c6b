//! Ledger event fan-out.
//!
//! The engine hands each committed change to its [`EventSink`]; in the daemon
//! that sink is this bus. Publishing is a non-blocking broadcast send, so a
//! slow or absent subscriber never holds up an order or portfolio lock.

use meridian_domain::LedgerEvent;
use meridian_engine::EventSink;
use thiserror::Error;
use tokio::sync::broadcast;

/// Buffered events per subscriber before it starts lagging
pub const DEFAULT_CAPACITY: usize = 1024;

/// Message carried on the bus.
#[derive(Debug, Clone)]
pub enum DaemonEvent {
    /// A change committed by the engine
    Ledger(LedgerEvent),
    /// Stop the main loop
    Shutdown,
}

/// A subscriber fell behind and events were overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("subscriber lagged, {skipped} events dropped")]
pub struct Lagged {
    pub skipped: u64,
}

/// Broadcast bus for [`DaemonEvent`]s.
pub struct EventBus {
    sender: broadcast::Sender<DaemonEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Broadcast `event`; returns how many subscribers it reached.
    pub fn send(&self, event: DaemonEvent) -> usize {
        // An error only means nobody is subscribed
        self.sender.send(event).unwrap_or_default()
    }

    /// New subscriber, seeing only events sent from now on.
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            inner: self.sender.subscribe(),
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: LedgerEvent) {
        self.send(DaemonEvent::Ledger(event));
    }
}

/// One subscription to an [`EventBus`].
pub struct EventReceiver {
    inner: broadcast::Receiver<DaemonEvent>,
}

impl EventReceiver {
    /// Wait for the next event. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Result<DaemonEvent, Lagged>> {
        match self.inner.recv().await {
            Ok(event) => Some(Ok(event)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => Some(Err(Lagged { skipped })),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Next buffered event, if any.
    pub fn try_recv(&mut self) -> Option<Result<DaemonEvent, Lagged>> {
        use broadcast::error::TryRecvError;

        match self.inner.try_recv() {
            Ok(event) => Some(Ok(event)),
            Err(TryRecvError::Lagged(skipped)) => Some(Err(Lagged { skipped })),
            Err(TryRecvError::Empty | TryRecvError::Closed) => None,
        }
    }
}
