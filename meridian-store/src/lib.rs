//! Meridian Storage Layer
//!
//! Explicitly owned, injectable state for users, orders, portfolios and
//! per-user history.
//!
//! # Architecture
//!
//! - **Repository traits**: Define the storage interface (ports)
//! - **In-memory store**: Lock-scoped implementation used by the engine
//!
//! # Locking
//!
//! Every order and every user's portfolio lives in its own cell
//! (`Arc<Mutex<_>>`). Map-level locks are only held long enough to look a
//! cell up or insert one; mutations lock the individual cell, so work on
//! different orders or users never contends.
//!
//! # Usage
//!
//! ```rust
//! use meridian_store::{MemoryStore, Store};
//! use meridian_domain::{User, UserId};
//!
//! let store = MemoryStore::new();
//! let user = User::new(UserId::new("u1").unwrap(), "Jane Doe", "jane@x.com").unwrap();
//! store.users().insert(user).unwrap();
//!
//! assert!(store.users().exists(&UserId::new("u1").unwrap()).unwrap());
//! ```

#![warn(clippy::all)]

// Modules
mod error;
mod memory;
mod repository;

// Re-exports
pub use error::StoreError;
pub use memory::MemoryStore;
pub use repository::{
    HistoryRepository, OrderCell, OrderRepository, PortfolioCell, PortfolioRepository, Store,
    UserRepository,
};
