//! Meridian Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains users, orders, trades, portfolio accounting and domain events.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod entities;
pub mod events;
pub mod portfolio;
pub mod value_objects;

// Re-export commonly used types
pub use entities::{Order, OrderId, OrderStatus, Trade, TradeId, User, UserId, UserUpdate};
pub use events::LedgerEvent;
pub use portfolio::{Fill, Portfolio, Position, ShortSellPolicy, TradeEffect};
pub use value_objects::{DomainError, Email, OrderSide, Price, Quantity, Symbol};
