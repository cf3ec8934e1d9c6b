//! Order Lifecycle Manager.
//!
//! Places orders, executes them at most once and cancels them.
//!
//! # At-most-once execution
//!
//! `execute_trade` holds the order's lock from the status check until the
//! transition to `Executed` is written. A concurrent caller blocks on the
//! same lock and then observes a terminal status, so exactly one trade is
//! ever produced per order.
//!
//! The new order and portfolio states are staged on copies. They replace the
//! live ones only after the trade is appended to the user's history, so a
//! failure at any step leaves no partial trade behind.

use chrono::Utc;
use meridian_domain::{
    LedgerEvent, Order, OrderId, OrderSide, OrderStatus, Price, Quantity, Symbol, Trade,
};
use meridian_store::Store;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::Engine;

impl<S: Store> Engine<S> {
    /// Place a new order in `pending` state.
    ///
    /// # Errors
    ///
    /// `UserNotFound`, `InvalidQuantity` (≤ 0), `InvalidPrice` (≤ 0),
    /// `InvalidSymbol`.
    pub fn place_order(
        &self,
        user_id: &str,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        limit_price: Decimal,
    ) -> EngineResult<Order> {
        let user_id = self.resolve_user(user_id)?;
        let quantity = Quantity::new(quantity)?;
        let limit_price = Price::new(limit_price)?;
        let symbol = Symbol::parse(symbol)?;

        let order = Order::new(user_id.clone(), symbol, side, quantity, limit_price);
        self.store.orders().insert(order.clone())?;
        self.store.history().append_order(&user_id, order.id)?;

        info!(
            order_id = %order.id,
            %user_id,
            symbol = %order.symbol,
            side = %order.side,
            quantity = %order.quantity,
            limit_price = %order.limit_price,
            "Order placed"
        );

        self.events.publish(LedgerEvent::OrderPlaced {
            order_id: order.id,
            user_id,
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            limit_price: order.limit_price,
            timestamp: order.created_at,
        });

        Ok(order)
    }

    /// Execute a pending order at `execution_price`.
    ///
    /// The portfolio already reflects the trade when this returns `Ok`.
    ///
    /// # Errors
    ///
    /// `OrderNotFound`, `InvalidOrderState` (order not pending),
    /// `InvalidPrice` (≤ 0), `InsufficientPosition` (sell beyond holdings),
    /// `ArithmeticOverflow`, `Store` if the trade cannot be recorded.
    /// On any error the order stays as it was and no trade is recorded.
    pub fn execute_trade(&self, order_id: OrderId, execution_price: Decimal) -> EngineResult<Trade> {
        let cell = self
            .store
            .orders()
            .cell(order_id)?
            .ok_or(EngineError::OrderNotFound(order_id))?;

        let mut order = cell.lock();
        if !order.is_pending() {
            warn!(%order_id, status = %order.status, "Execution rejected: order not pending");
            return Err(EngineError::InvalidOrderState {
                order_id,
                status: order.status,
            });
        }

        let price = Price::new(execution_price)?;

        let portfolio_cell = self
            .store
            .portfolios()
            .cell(&order.user_id)?
            .ok_or_else(|| EngineError::UserNotFound(order.user_id.to_string()))?;
        let mut portfolio = portfolio_cell.lock();

        // Stage every change, record the trade, then commit the staged state
        let trade = Trade::for_order(&order, price, Utc::now());
        let mut next_portfolio = portfolio.clone();
        let effect = self.ledger.apply_trade(&mut next_portfolio, &trade)?;
        let mut next_order = order.clone();
        next_order.mark_executed(trade.executed_at)?;

        self.store.history().append_trade(&next_order.user_id, &trade)?;
        *portfolio = next_portfolio;
        *order = next_order;

        info!(
            %order_id,
            trade_id = %trade.id,
            user_id = %trade.user_id,
            symbol = %trade.symbol,
            side = %trade.side,
            quantity = %trade.quantity,
            price = %trade.execution_price,
            "Trade executed"
        );

        // Published under the portfolio lock so events for one user arrive in
        // the order their trades were applied
        self.events.publish(LedgerEvent::TradeExecuted {
            trade_id: trade.id,
            order_id,
            user_id: trade.user_id.clone(),
            symbol: trade.symbol.clone(),
            side: trade.side,
            quantity: trade.quantity,
            execution_price: trade.execution_price,
            realized_pnl: effect.realized_pnl,
            timestamp: trade.executed_at,
        });

        drop(portfolio);
        drop(order);

        Ok(trade)
    }

    /// Cancel a pending order.
    ///
    /// Returns `Ok(true)` if the order was pending and is now cancelled,
    /// `Ok(false)` if it was already cancelled.
    ///
    /// # Errors
    ///
    /// `OrderNotFound`, `InvalidOrderState` if the order was executed.
    pub fn cancel_order(&self, order_id: OrderId) -> EngineResult<bool> {
        let cell = self
            .store
            .orders()
            .cell(order_id)?
            .ok_or(EngineError::OrderNotFound(order_id))?;

        let mut order = cell.lock();
        match order.status {
            OrderStatus::Pending => {
                order.mark_cancelled()?;
                let user_id = order.user_id.clone();

                info!(%order_id, %user_id, "Order cancelled");
                self.events.publish(LedgerEvent::OrderCancelled {
                    order_id,
                    user_id,
                    timestamp: Utc::now(),
                });
                Ok(true)
            },
            OrderStatus::Cancelled => {
                debug!(%order_id, "Order already cancelled");
                Ok(false)
            },
            OrderStatus::Executed => {
                warn!(%order_id, "Cancel rejected: order already executed");
                Err(EngineError::InvalidOrderState {
                    order_id,
                    status: OrderStatus::Executed,
                })
            },
        }
    }

    /// Snapshot of an order.
    pub fn get_order(&self, order_id: OrderId) -> EngineResult<Order> {
        self.store
            .orders()
            .find_by_id(order_id)?
            .ok_or(EngineError::OrderNotFound(order_id))
    }

    /// A user's pending orders, oldest first.
    pub fn pending_orders(&self, user_id: &str) -> EngineResult<Vec<Order>> {
        let user_id = self.resolve_user(user_id)?;
        Ok(self.store.orders().find_pending_by_user(&user_id)?)
    }
}

// =============================================================================
// Tests
// =============================================================================
