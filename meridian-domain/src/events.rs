//! Domain Events for Meridian
//!
//! Events are immutable records of state changes, published after the
//! change has been committed. Used for audit trails and fan-out to
//! subscribers.

use crate::entities::{OrderId, TradeId, UserId};
use crate::value_objects::{OrderSide, Price, Quantity, Symbol};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Domain events for user, order and trade lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// User registered
    UserCreated {
        /// User identifier
        user_id: UserId,
        /// When the user was created
        timestamp: DateTime<Utc>,
    },

    /// Mutable user fields changed
    UserUpdated {
        /// User identifier
        user_id: UserId,
        /// When the update was applied
        timestamp: DateTime<Utc>,
    },

    /// Order accepted in pending state
    OrderPlaced {
        /// Order identifier
        order_id: OrderId,
        /// Owner of the order
        user_id: UserId,
        /// Instrument
        symbol: Symbol,
        /// Direction
        side: OrderSide,
        /// Requested quantity
        quantity: Quantity,
        /// Limit price
        limit_price: Price,
        /// When the order was placed
        timestamp: DateTime<Utc>,
    },

    /// Order executed and applied to the portfolio
    TradeExecuted {
        /// Trade identifier
        trade_id: TradeId,
        /// Executed order
        order_id: OrderId,
        /// Owner of the order
        user_id: UserId,
        /// Instrument
        symbol: Symbol,
        /// Direction
        side: OrderSide,
        /// Executed quantity
        quantity: Quantity,
        /// Execution price
        execution_price: Price,
        /// P&L realized by this trade
        realized_pnl: Decimal,
        /// When the execution occurred
        timestamp: DateTime<Utc>,
    },

    /// Pending order cancelled
    OrderCancelled {
        /// Order identifier
        order_id: OrderId,
        /// Owner of the order
        user_id: UserId,
        /// When the cancellation occurred
        timestamp: DateTime<Utc>,
    },
}

impl LedgerEvent {
    /// User this event belongs to
    pub fn user_id(&self) -> &UserId {
        match self {
            LedgerEvent::UserCreated { user_id, .. }
            | LedgerEvent::UserUpdated { user_id, .. }
            | LedgerEvent::OrderPlaced { user_id, .. }
            | LedgerEvent::TradeExecuted { user_id, .. }
            | LedgerEvent::OrderCancelled { user_id, .. } => user_id,
        }
    }

    /// Event type name (matches the serialized `type` tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::UserCreated { .. } => "user_created",
            LedgerEvent::UserUpdated { .. } => "user_updated",
            LedgerEvent::OrderPlaced { .. } => "order_placed",
            LedgerEvent::TradeExecuted { .. } => "trade_executed",
            LedgerEvent::OrderCancelled { .. } => "order_cancelled",
        }
    }

    /// When the event occurred
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::UserCreated { timestamp, .. }
            | LedgerEvent::UserUpdated { timestamp, .. }
            | LedgerEvent::OrderPlaced { timestamp, .. }
            | LedgerEvent::TradeExecuted { timestamp, .. }
            | LedgerEvent::OrderCancelled { timestamp, .. } => *timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tag_matches_event_type() {
        let event = LedgerEvent::OrderCancelled {
            order_id: uuid::Uuid::now_v7(),
            user_id: UserId::new("u1").unwrap(),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["user_id"], "u1");

        let parsed: LedgerEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }
}
