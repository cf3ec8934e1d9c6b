//! Engine error types.
//!
//! Every error is returned before any state is written, so a failed
//! operation leaves users, orders and portfolios exactly as they were.

use meridian_domain::{DomainError, OrderId, OrderStatus};
use meridian_store::StoreError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors surfaced to callers of trading operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No user with this id
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// A user with this id already exists
    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    /// No order with this id
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Operation not allowed in the order's current status
    #[error("Invalid order state: order {order_id} is {status}")]
    InvalidOrderState {
        /// Order the operation targeted
        order_id: OrderId,
        /// Status observed under the order's lock
        status: OrderStatus,
    },

    /// Entity-level transition rejected by the domain
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// Quantity must be positive
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Price must be positive
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// Sell exceeds the held position
    #[error("Insufficient position in {symbol}: held {held}, requested {requested}")]
    InsufficientPosition {
        /// Symbol being sold
        symbol: String,
        /// Quantity held
        held: Decimal,
        /// Quantity requested
        requested: Decimal,
    },

    /// Symbol failed validation
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Side is neither buy nor sell
    #[error("Invalid side: {0}")]
    InvalidSide(String),

    /// User fields failed validation
    #[error("Invalid user: {0}")]
    InvalidUser(String),

    /// Resulting cash, position or P&L does not fit in a `Decimal`
    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    /// Storage failure
    #[error("Store error: {0}")]
    Store(StoreError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl From<DomainError> for EngineError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidPrice(msg) => EngineError::InvalidPrice(msg),
            DomainError::InvalidQuantity(msg) => EngineError::InvalidQuantity(msg),
            DomainError::InvalidSymbol(msg) => EngineError::InvalidSymbol(msg),
            DomainError::InvalidSide(msg) => EngineError::InvalidSide(msg),
            DomainError::InvalidUser(msg) => EngineError::InvalidUser(msg),
            DomainError::InsufficientPosition { symbol, held, requested } => {
                EngineError::InsufficientPosition { symbol, held, requested }
            },
            DomainError::InvalidStateTransition(msg) => EngineError::InvalidTransition(msg),
            DomainError::ArithmeticOverflow(msg) => EngineError::ArithmeticOverflow(msg),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Domain(domain) => domain.into(),
            other => EngineError::Store(other),
        }
    }
}

impl EngineError {
    /// Stable machine-readable kind, used by outer surfaces
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::UserNotFound(_) => "UserNotFound",
            EngineError::UserAlreadyExists(_) => "UserAlreadyExists",
            EngineError::OrderNotFound(_) => "OrderNotFound",
            EngineError::InvalidOrderState { .. } | EngineError::InvalidTransition(_) => {
                "InvalidOrderState"
            },
            EngineError::InvalidQuantity(_) => "InvalidQuantity",
            EngineError::InvalidPrice(_) => "InvalidPrice",
            EngineError::InsufficientPosition { .. } => "InsufficientPosition",
            EngineError::InvalidSymbol(_) => "InvalidSymbol",
            EngineError::InvalidSide(_) => "InvalidSide",
            EngineError::InvalidUser(_) => "InvalidUser",
            EngineError::ArithmeticOverflow(_) => "ArithmeticOverflow",
            EngineError::Store(_) => "StoreError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_domain_errors_map_to_engine_kinds() {
        let err: EngineError = DomainError::InvalidPrice("x".into()).into();
        assert_eq!(err.kind(), "InvalidPrice");

        let err: EngineError = DomainError::InsufficientPosition {
            symbol: "GOLD".into(),
            held: dec!(1),
            requested: dec!(2),
        }
        .into();
        assert!(matches!(err, EngineError::InsufficientPosition { .. }));
    }

    #[test]
    fn test_store_domain_errors_unwrap() {
        let err: EngineError = StoreError::Domain(DomainError::InvalidUser("bad".into())).into();
        assert!(matches!(err, EngineError::InvalidUser(_)));

        let err: EngineError = StoreError::not_found("user", "u9").into();
        assert_eq!(err.kind(), "StoreError");
    }
}
