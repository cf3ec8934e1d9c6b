//! Repository trait definitions (Ports)
//!
//! These traits define the storage interface for the engine.
//! All operations are synchronous and never perform blocking I/O.

use std::sync::Arc;

use meridian_domain::{Order, OrderId, Portfolio, Trade, User, UserId, UserUpdate};
use parking_lot::Mutex;

use crate::error::StoreError;

/// Lockable cell holding one order
pub type OrderCell = Arc<Mutex<Order>>;

/// Lockable cell holding one user's portfolio
pub type PortfolioCell = Arc<Mutex<Portfolio>>;

/// Repository for User entities
pub trait UserRepository: Send + Sync {
    /// Insert a new user; fails with `Duplicate` if the id is taken
    fn insert(&self, user: User) -> Result<(), StoreError>;

    /// Find a user by ID
    fn find_by_id(&self, id: &UserId) -> Result<Option<User>, StoreError>;

    /// Check whether a user exists
    fn exists(&self, id: &UserId) -> Result<bool, StoreError>;

    /// Apply a partial update and return the updated user
    fn update(&self, id: &UserId, update: &UserUpdate) -> Result<User, StoreError>;
}

/// Repository for Order entities
pub trait OrderRepository: Send + Sync {
    /// Insert a new order and return its cell
    fn insert(&self, order: Order) -> Result<OrderCell, StoreError>;

    /// Get the lockable cell of an order
    fn cell(&self, id: OrderId) -> Result<Option<OrderCell>, StoreError>;

    /// Snapshot of an order by ID
    fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Snapshots of a user's pending orders, oldest first
    fn find_pending_by_user(&self, user_id: &UserId) -> Result<Vec<Order>, StoreError>;
}

/// Repository for per-user Portfolios
pub trait PortfolioRepository: Send + Sync {
    /// Register the portfolio of a newly created user
    fn insert(&self, portfolio: Portfolio) -> Result<PortfolioCell, StoreError>;

    /// Get the lockable cell of a user's portfolio
    fn cell(&self, user_id: &UserId) -> Result<Option<PortfolioCell>, StoreError>;

    /// Consistent snapshot of a user's portfolio
    fn snapshot(&self, user_id: &UserId) -> Result<Option<Portfolio>, StoreError>;
}

/// Append-only per-user history of orders and trades
pub trait HistoryRepository: Send + Sync {
    /// Append an order id to the user's order sequence
    fn append_order(&self, user_id: &UserId, order_id: OrderId) -> Result<(), StoreError>;

    /// Append a trade to the user's trade sequence
    fn append_trade(&self, user_id: &UserId, trade: &Trade) -> Result<(), StoreError>;

    /// The user's order ids in insertion order
    fn order_ids(&self, user_id: &UserId) -> Result<Vec<OrderId>, StoreError>;

    /// The user's trades in execution order
    fn trades(&self, user_id: &UserId) -> Result<Vec<Trade>, StoreError>;
}

/// Combined store interface
pub trait Store: Send + Sync {
    /// Get user repository
    fn users(&self) -> &dyn UserRepository;

    /// Get order repository
    fn orders(&self) -> &dyn OrderRepository;

    /// Get portfolio repository
    fn portfolios(&self) -> &dyn PortfolioRepository;

    /// Get history repository
    fn history(&self) -> &dyn HistoryRepository;
}
