//! Portfolio accounting
//!
//! Applies executed fills to a user's positions, cash and realized P&L
//! using weighted-average-cost accounting.
//!
//! ```text
//! Buy  (long or flat):  qty' = qty + q
//!                       avg' = (qty × avg + q × price) / qty'
//!                       cash' = cash − q × price
//!
//! Sell (long):          qty' = qty − q
//!                       pnl' = pnl + (price − avg) × q
//!                       cash' = cash + q × price     (avg unchanged)
//! ```
//!
//! A portfolio is a pure function of its ordered trade sequence, see
//! [`Portfolio::replay`].

use crate::entities::{Trade, UserId};
use crate::value_objects::{DomainError, OrderSide, Price, Quantity, Symbol};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Short selling policy
// =============================================================================

/// Whether sells may exceed the held quantity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortSellPolicy {
    /// Selling beyond the held quantity fails with `InsufficientPosition`
    #[default]
    Disabled,
    /// Positions may go negative
    Allowed,
}

// =============================================================================
// Position
// =============================================================================

/// A user's holding of one symbol
///
/// `quantity` is signed: it is only negative when short selling is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    pub quantity: Decimal,
    /// Weighted average cost per unit of the open quantity
    pub average_cost: Decimal,
}

impl Position {
    /// Cost basis of the open quantity
    pub fn cost_basis(&self) -> Decimal {
        self.quantity.abs() * self.average_cost
    }

    /// Check if this is a short position
    pub fn is_short(&self) -> bool {
        self.quantity < Decimal::ZERO
    }
}

// =============================================================================
// Fill
// =============================================================================

/// An execution to be applied to a portfolio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Quantity,
    pub price: Price,
}

impl From<&Trade> for Fill {
    fn from(trade: &Trade) -> Self {
        Self {
            symbol: trade.symbol.clone(),
            side: trade.side,
            quantity: trade.quantity,
            price: trade.execution_price,
        }
    }
}

/// Effect of a fill on the portfolio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEffect {
    /// Signed cash movement
    pub cash_delta: Decimal,
    /// P&L realized by this fill
    pub realized_pnl: Decimal,
    /// Position quantity after the fill
    pub position_quantity: Decimal,
    /// Average cost after the fill (zero when flat)
    pub average_cost: Decimal,
}

// =============================================================================
// Portfolio
// =============================================================================

/// Aggregate of a user's positions, cash and realized P&L
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    pub user_id: UserId,
    /// Open positions keyed by symbol; flat positions are removed
    pub positions: BTreeMap<Symbol, Position>,
    pub cash_balance: Decimal,
    pub realized_pnl: Decimal,
    /// Number of trades applied so far
    pub trade_count: u64,
    pub updated_at: DateTime<Utc>,
}

impl Portfolio {
    /// Create an empty portfolio holding only cash
    pub fn new(user_id: UserId, initial_cash: Decimal) -> Self {
        Self {
            user_id,
            positions: BTreeMap::new(),
            cash_balance: initial_cash,
            realized_pnl: Decimal::ZERO,
            trade_count: 0,
            updated_at: Utc::now(),
        }
    }

    /// Get the open position for a symbol
    pub fn position(&self, symbol: &Symbol) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// Held quantity for a symbol (zero when flat)
    pub fn quantity_of(&self, symbol: &Symbol) -> Decimal {
        self.positions.get(symbol).map(|p| p.quantity).unwrap_or(Decimal::ZERO)
    }

    /// Apply a fill.
    ///
    /// The new position, cash and P&L are computed first and written
    /// together; on error the portfolio is untouched.
    ///
    /// # Errors
    /// Returns `DomainError::InsufficientPosition` when selling more than is
    /// held and short selling is disabled, `DomainError::ArithmeticOverflow`
    /// when any resulting amount does not fit a `Decimal`.
    pub fn apply_fill(
        &mut self,
        fill: &Fill,
        policy: ShortSellPolicy,
    ) -> Result<TradeEffect, DomainError> {
        let (held, avg) = self
            .positions
            .get(&fill.symbol)
            .map(|p| (p.quantity, p.average_cost))
            .unwrap_or((Decimal::ZERO, Decimal::ZERO));

        let qty = fill.quantity.as_decimal();
        let price = fill.price.as_decimal();

        if fill.side == OrderSide::Sell && policy == ShortSellPolicy::Disabled && qty > held {
            return Err(DomainError::InsufficientPosition {
                symbol: fill.symbol.to_string(),
                held: held.max(Decimal::ZERO),
                requested: qty,
            });
        }

        let notional = fill.quantity.notional(fill.price)?;
        let (new_qty, new_avg, realized) = match fill.side {
            OrderSide::Buy => buy(held, avg, qty, price)?,
            OrderSide::Sell => sell(held, avg, qty, price)?,
        };
        let cash_delta = checked(fill.side.cash_sign().checked_mul(notional), "cash delta")?;
        let cash_balance = checked(self.cash_balance.checked_add(cash_delta), "cash balance")?;
        let realized_pnl = checked(self.realized_pnl.checked_add(realized), "realized P&L")?;

        let effect = TradeEffect {
            cash_delta,
            realized_pnl: realized,
            position_quantity: new_qty,
            average_cost: new_avg,
        };

        // Every value is known; nothing below can fail
        if new_qty.is_zero() {
            self.positions.remove(&fill.symbol);
        } else {
            self.positions.insert(
                fill.symbol.clone(),
                Position {
                    symbol: fill.symbol.clone(),
                    quantity: new_qty,
                    average_cost: new_avg,
                },
            );
        }
        self.cash_balance = cash_balance;
        self.realized_pnl = realized_pnl;
        self.trade_count += 1;
        self.updated_at = Utc::now();

        Ok(effect)
    }

    /// Rebuild a portfolio from its ordered trade sequence
    pub fn replay<'a>(
        user_id: UserId,
        initial_cash: Decimal,
        policy: ShortSellPolicy,
        trades: impl IntoIterator<Item = &'a Trade>,
    ) -> Result<Self, DomainError> {
        let mut portfolio = Self::new(user_id, initial_cash);
        for trade in trades {
            portfolio.apply_fill(&Fill::from(trade), policy)?;
        }
        Ok(portfolio)
    }

    /// Check that two portfolios hold the same accounting state
    ///
    /// Ignores `updated_at`, which differs between a live and a replayed copy.
    pub fn same_books(&self, other: &Portfolio) -> bool {
        self.user_id == other.user_id
            && self.positions == other.positions
            && self.cash_balance == other.cash_balance
            && self.realized_pnl == other.realized_pnl
            && self.trade_count == other.trade_count
    }
}

fn checked(value: Option<Decimal>, what: &str) -> Result<Decimal, DomainError> {
    value.ok_or_else(|| DomainError::ArithmeticOverflow(what.to_string()))
}

/// `(a × b + c × d) / n`, the weighted average of two lots
fn weighted(a: Decimal, b: Decimal, c: Decimal, d: Decimal, n: Decimal) -> Result<Decimal, DomainError> {
    let first = checked(a.checked_mul(b), "cost basis")?;
    let second = checked(c.checked_mul(d), "cost basis")?;
    let total = checked(first.checked_add(second), "cost basis")?;
    checked(total.checked_div(n), "average cost")
}

/// Returns (new quantity, new average cost, realized P&L) for a buy
fn buy(held: Decimal, avg: Decimal, qty: Decimal, price: Decimal) -> Result<(Decimal, Decimal, Decimal), DomainError> {
    let new_qty = checked(held.checked_add(qty), "position quantity")?;

    if held >= Decimal::ZERO {
        let new_avg = if held.is_zero() {
            price
        } else {
            weighted(held, avg, qty, price, new_qty)?
        };
        return Ok((new_qty, new_avg, Decimal::ZERO));
    }

    // Covering a short
    let covered = qty.min(-held);
    let per_unit = checked(avg.checked_sub(price), "realized P&L")?;
    let realized = checked(per_unit.checked_mul(covered), "realized P&L")?;
    let new_avg = if new_qty < Decimal::ZERO {
        avg
    } else if new_qty.is_zero() {
        Decimal::ZERO
    } else {
        price
    };
    Ok((new_qty, new_avg, realized))
}

/// Returns (new quantity, new average cost, realized P&L) for a sell
fn sell(held: Decimal, avg: Decimal, qty: Decimal, price: Decimal) -> Result<(Decimal, Decimal, Decimal), DomainError> {
    let new_qty = checked(held.checked_sub(qty), "position quantity")?;

    if held > Decimal::ZERO {
        let closed = qty.min(held);
        let per_unit = checked(price.checked_sub(avg), "realized P&L")?;
        let realized = checked(per_unit.checked_mul(closed), "realized P&L")?;
        let new_avg = if new_qty > Decimal::ZERO {
            avg
        } else if new_qty.is_zero() {
            Decimal::ZERO
        } else {
            price
        };
        return Ok((new_qty, new_avg, realized));
    }

    // Opening or extending a short
    let new_avg = if held.is_zero() {
        price
    } else {
        weighted(held.abs(), avg, qty, price, new_qty.abs())?
    };
    Ok((new_qty, new_avg, Decimal::ZERO))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    fn fill(symbol: &str, side: OrderSide, qty: Decimal, price: Decimal) -> Fill {
        Fill {
            symbol: Symbol::parse(symbol).unwrap(),
            side,
            quantity: Quantity::new(qty).unwrap(),
            price: Price::new(price).unwrap(),
        }
    }

    fn portfolio() -> Portfolio {
        Portfolio::new(UserId::new("u1").unwrap(), dec!(0))
    }

    #[test]
    fn test_weighted_average_cost() {
        let mut p = portfolio();
        p.apply_fill(&fill("GOLD", OrderSide::Buy, dec!(100), dec!(10)), ShortSellPolicy::Disabled)
            .unwrap();
        p.apply_fill(&fill("GOLD", OrderSide::Buy, dec!(100), dec!(20)), ShortSellPolicy::Disabled)
            .unwrap();

        let pos = p.position(&Symbol::parse("GOLD").unwrap()).unwrap();
        assert_eq!(pos.quantity, dec!(200));
        assert_eq!(pos.average_cost, dec!(15));
        assert_eq!(p.cash_balance, dec!(-3000));
    }

    #[test]
    fn test_sell_realizes_pnl_and_keeps_cost_basis() {
        let mut p = portfolio();
        p.apply_fill(&fill("GOLD", OrderSide::Buy, dec!(100), dec!(10)), ShortSellPolicy::Disabled)
            .unwrap();

        let effect = p
            .apply_fill(&fill("GOLD", OrderSide::Sell, dec!(40), dec!(12.5)), ShortSellPolicy::Disabled)
            .unwrap();

        assert_eq!(effect.realized_pnl, dec!(100));
        assert_eq!(effect.cash_delta, dec!(500));
        let pos = p.position(&Symbol::parse("GOLD").unwrap()).unwrap();
        assert_eq!(pos.quantity, dec!(60));
        assert_eq!(pos.average_cost, dec!(10));
        assert_eq!(p.realized_pnl, dec!(100));
        assert_eq!(p.cash_balance, dec!(-500));
    }

    #[test]
    fn test_sell_to_flat_removes_position() {
        let mut p = portfolio();
        p.apply_fill(&fill("GOLD", OrderSide::Buy, dec!(5), dec!(10)), ShortSellPolicy::Disabled)
            .unwrap();
        p.apply_fill(&fill("GOLD", OrderSide::Sell, dec!(5), dec!(8)), ShortSellPolicy::Disabled)
            .unwrap();

        assert!(p.positions.is_empty());
        assert_eq!(p.realized_pnl, dec!(-10));
        assert_eq!(p.cash_balance, dec!(-10));
    }

    #[test]
    fn test_oversell_rejected_without_side_effects() {
        let mut p = portfolio();
        p.apply_fill(&fill("GOLD", OrderSide::Buy, dec!(10), dec!(10)), ShortSellPolicy::Disabled)
            .unwrap();
        let before = p.clone();

        let err = p
            .apply_fill(&fill("GOLD", OrderSide::Sell, dec!(11), dec!(10)), ShortSellPolicy::Disabled)
            .unwrap_err();

        assert!(matches!(err, DomainError::InsufficientPosition { .. }));
        assert_eq!(p, before);
    }

    #[test]
    fn test_sell_without_position_rejected() {
        let mut p = portfolio();
        let result =
            p.apply_fill(&fill("GOLD", OrderSide::Sell, dec!(1), dec!(10)), ShortSellPolicy::Disabled);
        assert!(matches!(result, Err(DomainError::InsufficientPosition { .. })));
    }

    #[test]
    fn test_short_sell_and_cover() {
        let mut p = portfolio();
        let gold = Symbol::parse("GOLD").unwrap();

        p.apply_fill(&fill("GOLD", OrderSide::Buy, dec!(10), dec!(10)), ShortSellPolicy::Allowed)
            .unwrap();
        // Sell through zero: close 10 long at +5 each, open 5 short at 15
        let effect = p
            .apply_fill(&fill("GOLD", OrderSide::Sell, dec!(15), dec!(15)), ShortSellPolicy::Allowed)
            .unwrap();
        assert_eq!(effect.realized_pnl, dec!(50));
        assert_eq!(p.position(&gold).unwrap().quantity, dec!(-5));
        assert_eq!(p.position(&gold).unwrap().average_cost, dec!(15));

        // Extend short: 5 @15 + 5 @25 → avg 20
        p.apply_fill(&fill("GOLD", OrderSide::Sell, dec!(5), dec!(25)), ShortSellPolicy::Allowed)
            .unwrap();
        assert_eq!(p.position(&gold).unwrap().average_cost, dec!(20));

        // Cover 10 @18 → +2 each
        let effect = p
            .apply_fill(&fill("GOLD", OrderSide::Buy, dec!(10), dec!(18)), ShortSellPolicy::Allowed)
            .unwrap();
        assert_eq!(effect.realized_pnl, dec!(20));
        assert!(p.position(&gold).is_none());
        assert_eq!(p.realized_pnl, dec!(70));
    }

    #[test]
    fn test_cash_equals_sum_of_flows() {
        let mut p = Portfolio::new(UserId::new("u1").unwrap(), dec!(1000));
        let fills = [
            fill("A", OrderSide::Buy, dec!(3), dec!(1.10)),
            fill("B", OrderSide::Buy, dec!(7), dec!(2.30)),
            fill("A", OrderSide::Sell, dec!(2), dec!(1.40)),
        ];
        let mut expected = dec!(1000);
        for f in &fills {
            let effect = p.apply_fill(f, ShortSellPolicy::Disabled).unwrap();
            expected += effect.cash_delta;
        }

        assert_eq!(p.cash_balance, expected);
        assert_eq!(p.cash_balance, dec!(1000) - dec!(3.30) - dec!(16.10) + dec!(2.80));
    }

    #[test]
    fn test_overflowing_fill_leaves_portfolio_untouched() {
        let huge = Decimal::from_str("50000000000000000000000000000").unwrap();
        let mut p = portfolio();
        p.apply_fill(&fill("A", OrderSide::Buy, huge, dec!(1)), ShortSellPolicy::Disabled)
            .unwrap();
        let before = p.clone();

        // Position B fits, cash does not
        let err = p
            .apply_fill(&fill("B", OrderSide::Buy, huge, dec!(1)), ShortSellPolicy::Disabled)
            .unwrap_err();

        assert!(matches!(err, DomainError::ArithmeticOverflow(_)));
        assert_eq!(p, before);
        assert!(p.position(&Symbol::parse("B").unwrap()).is_none());
    }

    #[test]
    fn test_overflowing_notional_rejected() {
        let mut p = portfolio();
        let result = p.apply_fill(
            &fill("A", OrderSide::Buy, Decimal::MAX, dec!(2)),
            ShortSellPolicy::Disabled,
        );
        assert!(matches!(result, Err(DomainError::ArithmeticOverflow(_))));
        assert!(p.positions.is_empty());
        assert_eq!(p.trade_count, 0);
    }
}
