//! History queries.
//!
//! Order history is kept as ids and resolved to current snapshots on read,
//! so a cancelled or executed order shows its latest status. Trades are
//! immutable and stored whole.

use meridian_domain::{Order, Trade};
use meridian_store::Store;
use tracing::warn;

use crate::error::EngineResult;
use crate::Engine;

impl<S: Store> Engine<S> {
    /// All orders the user has placed, in placement order.
    pub fn get_order_history(&self, user_id: &str) -> EngineResult<Vec<Order>> {
        let user_id = self.resolve_user(user_id)?;
        let ids = self.store.history().order_ids(&user_id)?;

        let mut orders = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.orders().find_by_id(id)? {
                Some(order) => orders.push(order),
                None => warn!(%user_id, order_id = %id, "Order in history has no record"),
            }
        }
        Ok(orders)
    }

    /// All trades executed for the user, in execution order.
    pub fn get_trade_history(&self, user_id: &str) -> EngineResult<Vec<Trade>> {
        let user_id = self.resolve_user(user_id)?;
        Ok(self.store.history().trades(&user_id)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Engine, EngineConfig, EngineError};
    use meridian_domain::{OrderSide, OrderStatus};
    use meridian_store::MemoryStore;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn engine() -> Engine<MemoryStore> {
        let engine = Engine::new(MemoryStore::new(), EngineConfig::default());
        engine.create_user("u1", "Jane Doe", "jane@x.com").unwrap();
        engine.create_user("u2", "John Roe", "john@x.com").unwrap();
        engine
    }

    #[test]
    fn test_unknown_user_has_no_history() {
        let engine = engine();
        assert!(matches!(engine.get_order_history("ghost"), Err(EngineError::UserNotFound(_))));
        assert!(matches!(engine.get_trade_history("ghost"), Err(EngineError::UserNotFound(_))));
    }

    #[test]
    fn test_order_history_reflects_current_status() {
        let engine = engine();
        let a = engine.place_order("u1", "GOLD", OrderSide::Buy, dec!(1), dec!(10)).unwrap();
        let b = engine.place_order("u1", "GOLD", OrderSide::Buy, dec!(2), dec!(11)).unwrap();
        let c = engine.place_order("u1", "GOLD", OrderSide::Buy, dec!(3), dec!(12)).unwrap();
        engine.place_order("u2", "GOLD", OrderSide::Buy, dec!(4), dec!(13)).unwrap();

        engine.execute_trade(a.id, dec!(10)).unwrap();
        engine.cancel_order(b.id).unwrap();

        let history = engine.get_order_history("u1").unwrap();
        let ids: Vec<_> = history.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);

        let statuses: Vec<_> = history.iter().map(|o| o.status).collect();
        assert_eq!(statuses, vec![OrderStatus::Executed, OrderStatus::Cancelled, OrderStatus::Pending]);
        assert_eq!(engine.get_order_history("u2").unwrap().len(), 1);
    }

    #[test]
    fn test_trade_history_in_execution_order() {
        let engine = engine();
        let first = engine.place_order("u1", "GOLD", OrderSide::Buy, dec!(1), dec!(10)).unwrap();
        let second = engine.place_order("u1", "GOLD", OrderSide::Buy, dec!(1), dec!(10)).unwrap();

        // Executed in reverse placement order
        engine.execute_trade(second.id, dec!(10)).unwrap();
        engine.execute_trade(first.id, dec!(9)).unwrap();

        let trades = engine.get_trade_history("u1").unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].order_id, second.id);
        assert_eq!(trades[1].order_id, first.id);
        assert!(engine.get_trade_history("u2").unwrap().is_empty());
    }

    #[test]
    fn test_cash_equals_sum_of_trade_flows() {
        let engine = engine();
        for (side, qty, price) in [
            (OrderSide::Buy, dec!(100), dec!(10)),
            (OrderSide::Buy, dec!(50), dec!(12.25)),
            (OrderSide::Sell, dec!(80), dec!(13.10)),
        ] {
            let order = engine.place_order("u1", "GOLD", side, qty, price).unwrap();
            engine.execute_trade(order.id, price).unwrap();
        }

        let flows: Decimal = engine
            .get_trade_history("u1")
            .unwrap()
            .iter()
            .map(|t| t.cash_flow().unwrap())
            .sum();
        let portfolio = engine.get_portfolio("u1").unwrap();
        assert_eq!(portfolio.cash_balance, flows);
        assert_eq!(flows, dec!(-1000) - dec!(612.50) + dec!(1048.00));
    }

    #[test]
    fn test_rebuild_matches_live_portfolio() {
        let engine = engine();
        for (side, qty, price) in [
            (OrderSide::Buy, dec!(100), dec!(10)),
            (OrderSide::Buy, dec!(100), dec!(20)),
            (OrderSide::Sell, dec!(150), dec!(18)),
            (OrderSide::Buy, dec!(10), dec!(17.5)),
        ] {
            let order = engine.place_order("u1", "GOLD", side, qty, price).unwrap();
            engine.execute_trade(order.id, price).unwrap();
        }

        let live = engine.get_portfolio("u1").unwrap();
        let rebuilt = engine.rebuild_portfolio("u1").unwrap();
        assert!(live.same_books(&rebuilt));
    }
}
