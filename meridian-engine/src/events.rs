//! Event publication seam.

use meridian_domain::LedgerEvent;

/// Receives ledger events after the change they describe is committed.
///
/// Order and trade events are published while the order's lock (and, for
/// trades, the portfolio's lock) is still held, so one user's trade events
/// arrive in the order their trades were applied. Implementations must not
/// block and must not call back into the engine.
pub trait EventSink: Send + Sync {
    /// Publish an event
    fn publish(&self, event: LedgerEvent);
}

/// Sink that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn publish(&self, _event: LedgerEvent) {}
}
