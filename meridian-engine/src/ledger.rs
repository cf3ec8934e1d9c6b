//! Portfolio Ledger: applies executed trades to a user's portfolio.
//!
//! The ledger is only ever invoked by the order lifecycle while it holds
//! both the order's lock and the portfolio's lock, so a reader of the
//! portfolio sees either none or all of a trade's effects.

use meridian_domain::{Fill, Portfolio, ShortSellPolicy, Trade, TradeEffect};
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::Engine;
use meridian_store::Store;

/// Applies fills under the configured short selling policy.
#[derive(Debug, Clone, Copy)]
pub struct PortfolioLedger {
    policy: ShortSellPolicy,
}

impl PortfolioLedger {
    /// Create a ledger with the given policy.
    pub fn new(policy: ShortSellPolicy) -> Self {
        Self { policy }
    }

    /// Short selling policy in force
    pub fn policy(&self) -> ShortSellPolicy {
        self.policy
    }

    /// Apply a trade to a locked portfolio.
    ///
    /// On error the portfolio is left untouched.
    pub fn apply_trade(&self, portfolio: &mut Portfolio, trade: &Trade) -> EngineResult<TradeEffect> {
        match portfolio.apply_fill(&Fill::from(trade), self.policy) {
            Ok(effect) => {
                debug!(
                    user_id = %portfolio.user_id,
                    symbol = %trade.symbol,
                    side = %trade.side,
                    quantity = %trade.quantity,
                    price = %trade.execution_price,
                    position = %effect.position_quantity,
                    average_cost = %effect.average_cost,
                    realized_pnl = %effect.realized_pnl,
                    cash = %portfolio.cash_balance,
                    "Trade applied to portfolio"
                );
                Ok(effect)
            },
            Err(err) => {
                warn!(
                    user_id = %portfolio.user_id,
                    symbol = %trade.symbol,
                    error = %err,
                    "Ledger rejected trade"
                );
                Err(err.into())
            },
        }
    }
}

impl<S: Store> Engine<S> {
    /// Consistent snapshot of a user's portfolio.
    pub fn get_portfolio(&self, user_id: &str) -> EngineResult<Portfolio> {
        let id = self.resolve_user(user_id)?;
        self.store
            .portfolios()
            .snapshot(&id)?
            .ok_or_else(|| EngineError::UserNotFound(id.to_string()))
    }

    /// Rebuild a user's portfolio by replaying their trade history.
    ///
    /// The live portfolio is locked while its history is read, so the
    /// replay covers exactly the trades the live copy has applied.
    pub fn rebuild_portfolio(&self, user_id: &str) -> EngineResult<Portfolio> {
        let id = self.resolve_user(user_id)?;
        let cell = self
            .store
            .portfolios()
            .cell(&id)?
            .ok_or_else(|| EngineError::UserNotFound(id.to_string()))?;

        let _live = cell.lock();
        let trades = self.store.history().trades(&id)?;
        let rebuilt =
            Portfolio::replay(id, self.config.initial_cash, self.ledger.policy(), trades.iter())?;

        Ok(rebuilt)
    }
}
