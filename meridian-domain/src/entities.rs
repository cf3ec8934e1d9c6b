//! Domain Entities for Meridian
//!
//! Users, orders and trades. Orders carry the lifecycle state machine:
//!
//! ```text
//! Pending ──► Executed   (terminal)
//!    │
//!    └──────► Cancelled  (terminal)
//! ```

use crate::value_objects::{DomainError, Email, OrderSide, Price, Quantity, Symbol};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an Order
pub type OrderId = Uuid;

/// Unique identifier for a Trade
pub type TradeId = Uuid;

// =============================================================================
// User
// =============================================================================

/// Caller-assigned user identifier (e.g., "u1")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a user id, trimming surrounding whitespace
    ///
    /// # Errors
    /// Returns `DomainError::InvalidUser` if the id is empty
    pub fn new(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidUser("User id must be non-empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered user
///
/// `id` is fixed at creation; only `name` and `email` change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with validated fields
    pub fn new(id: UserId, name: &str, email: &str) -> Result<Self, DomainError> {
        let name = validate_name(name)?;
        let email = Email::parse(email)?;
        let now = Utc::now();

        Ok(Self {
            id,
            name,
            email,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update.
    ///
    /// All fields are validated before any is written, so a rejected
    /// update leaves the user untouched.
    pub fn apply(&mut self, update: &UserUpdate) -> Result<(), DomainError> {
        let name = update.name.as_deref().map(validate_name).transpose()?;
        let email = update.email.as_deref().map(Email::parse).transpose()?;

        if name.is_none() && email.is_none() {
            return Ok(());
        }

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(email) = email {
            self.email = email;
        }
        self.updated_at = Utc::now();

        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String, DomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidUser("Name must be non-empty".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Partial update of the mutable user fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

// =============================================================================
// Order
// =============================================================================

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed, awaiting execution or cancellation
    Pending,
    /// Executed exactly once (terminal)
    Executed,
    /// Cancelled before execution (terminal)
    Cancelled,
}

impl OrderStatus {
    /// Get the name of the status for display
    pub fn name(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Executed => "executed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal statuses accept no further transitions
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A user's limit order for a symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Quantity,
    pub limit_price: Price,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    /// Set only on the transition to `Executed`
    pub executed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Create a new pending order
    pub fn new(
        user_id: UserId,
        symbol: Symbol,
        side: OrderSide,
        quantity: Quantity,
        limit_price: Price,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            symbol,
            side,
            quantity,
            limit_price,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            executed_at: None,
        }
    }

    /// Check if order is still pending
    pub fn is_pending(&self) -> bool {
        matches!(self.status, OrderStatus::Pending)
    }

    /// Ensure the order can still transition
    pub fn ensure_pending(&self) -> Result<(), DomainError> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(DomainError::InvalidStateTransition(format!(
                "order {} is {}",
                self.id, self.status
            )))
        }
    }

    /// Mark order as executed at the given instant
    ///
    /// The recorded instant is clamped so that `executed_at >= created_at`.
    pub fn mark_executed(&mut self, at: DateTime<Utc>) -> Result<DateTime<Utc>, DomainError> {
        self.ensure_pending()?;

        let executed_at = at.max(self.created_at);
        self.status = OrderStatus::Executed;
        self.executed_at = Some(executed_at);

        Ok(executed_at)
    }

    /// Mark order as cancelled
    pub fn mark_cancelled(&mut self) -> Result<(), DomainError> {
        self.ensure_pending()?;
        self.status = OrderStatus::Cancelled;
        Ok(())
    }
}

// =============================================================================
// Trade
// =============================================================================

/// Immutable record of an order's execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: OrderSide,
    /// Copied from the order at execution time
    pub quantity: Quantity,
    pub execution_price: Price,
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    /// Build the trade for a pending order executed at `execution_price`
    pub fn for_order(order: &Order, execution_price: Price, executed_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            order_id: order.id,
            user_id: order.user_id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            execution_price,
            executed_at: executed_at.max(order.created_at),
        }
    }

    /// Quantity × execution price
    pub fn notional(&self) -> Result<Decimal, DomainError> {
        self.quantity.notional(self.execution_price)
    }

    /// Signed cash flow: negative for buys, positive for sells
    pub fn cash_flow(&self) -> Result<Decimal, DomainError> {
        Ok(self.side.cash_sign() * self.notional()?)
    }
}

// =============================================================================
// Tests
// =============================================================================
