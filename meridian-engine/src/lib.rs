//! Meridian Engine Layer
//!
//! Order lifecycle and portfolio accounting over an injected [`Store`].
//!
//! # Flow
//!
//! ```text
//! create_user ─► place_order (pending) ─► execute_trade ─► Portfolio Ledger
//!                       │                      │                │
//!                       └──────────────► History Store ◄────────┘
//!                                              │
//!                    get_portfolio / get_order_history / get_trade_history
//! ```
//!
//! # Concurrency
//!
//! Every operation is synchronous and lock-scoped: an order's cell is
//! locked for its own transition, a user's portfolio cell for the ledger
//! update. Lock order is always order → portfolio → history.
//!
//! [`Store`]: meridian_store::Store

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod ledger;
pub mod lifecycle;
pub mod registry;

use std::sync::Arc;

use meridian_store::Store;

// Re-exports for convenience
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use events::{EventSink, NoopSink};
pub use ledger::PortfolioLedger;

/// Trading engine owning its state store
pub struct Engine<S: Store> {
    /// Exclusively owned state
    store: S,
    /// Engine configuration
    config: EngineConfig,
    /// Portfolio ledger (applies executed trades)
    ledger: PortfolioLedger,
    /// Receives events after each committed change
    events: Arc<dyn EventSink>,
}

impl<S: Store> Engine<S> {
    /// Create a new engine over the given store.
    pub fn new(store: S, config: EngineConfig) -> Self {
        let ledger = PortfolioLedger::new(config.short_selling);
        Self {
            store,
            config,
            ledger,
            events: Arc::new(NoopSink),
        }
    }

    /// Publish committed changes to `sink`.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read-only access to the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }
}
