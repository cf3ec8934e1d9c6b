//! Meridian Daemon Library
//!
//! Runtime host for the Meridian trading engine.
//!
//! # Architecture
//!
//! ```text
//! HTTP client → API Server → TradingService ─► Engine ─► MemoryStore
//!                                   │             │
//!                                   │             └─► Event Bus (ledger events)
//!                                   └─► EcosystemGateway (advisory only)
//! ```
//!
//! # Components
//!
//! - **Daemon**: Main runtime orchestrator
//! - **TradingService**: Engine plus advisory gateway
//! - **Event Bus**: Fan-out of committed ledger events
//! - **API**: HTTP endpoints for users, orders, portfolios and advisories
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use meridiand::{Config, Daemon};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("Failed to load config");
//!     let daemon = Daemon::build(config).await;
//!     daemon.run().await.expect("Daemon error");
//! }
//! ```

#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod daemon;
pub mod error;
pub mod event_bus;
pub mod service;

// Re-exports for convenience
pub use api::{create_router, ApiState};
pub use config::{ApiConfig, Config, Environment};
pub use daemon::Daemon;
pub use error::{DaemonError, DaemonResult};
pub use event_bus::{DaemonEvent, EventBus, EventReceiver, Lagged};
pub use service::TradingService;
