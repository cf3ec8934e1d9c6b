//! Trading service facade.
//!
//! Combines the engine with the ecosystem gateway. Trading operations go
//! straight to the engine; advisory calls read a snapshot from the engine
//! first, then ask the gateway. The gateway is never consulted on the
//! trading path.

use std::sync::Arc;

use meridian_domain::{OrderSide, Price, Quantity, Symbol};
use meridian_ecosystem::{
    Advisory, AiInsight, ComplianceReport, ComplianceRequest, EcosystemGateway, GatewayStatus,
    RecommendationRequest, RiskRequest, SecurityRequest, SecurityStatus,
};
use meridian_engine::{Engine, EngineResult};
use meridian_store::Store;
use rust_decimal::Decimal;
use tracing::debug;

/// Engine plus advisory gateway.
pub struct TradingService<S: Store> {
    engine: Engine<S>,
    gateway: Arc<EcosystemGateway>,
}

impl<S: Store> TradingService<S> {
    pub fn new(engine: Engine<S>, gateway: Arc<EcosystemGateway>) -> Self {
        Self { engine, gateway }
    }

    /// Trading engine
    pub fn engine(&self) -> &Engine<S> {
        &self.engine
    }

    /// Advisory gateway
    pub fn gateway(&self) -> &EcosystemGateway {
        &self.gateway
    }

    pub fn ecosystem_status(&self) -> GatewayStatus {
        self.gateway.status()
    }

    /// AI risk assessment of the user's current portfolio.
    ///
    /// # Errors
    ///
    /// `UserNotFound` only. Gateway problems are reported in the result.
    pub async fn assess_risk(&self, user_id: &str) -> EngineResult<Advisory<AiInsight>> {
        let portfolio = self.engine.get_portfolio(user_id)?;
        let request = RiskRequest {
            user_id: portfolio.user_id.clone(),
            portfolio,
        };
        Ok(self.gateway.assess_risk(&request).await)
    }

    /// AI recommendation for one symbol, given the user's holding.
    pub async fn recommend(&self, user_id: &str, symbol: &str) -> EngineResult<Advisory<AiInsight>> {
        let symbol = Symbol::parse(symbol)?;
        let portfolio = self.engine.get_portfolio(user_id)?;
        let request = RecommendationRequest {
            position: portfolio.position(&symbol).cloned(),
            user_id: portfolio.user_id,
            symbol,
        };
        Ok(self.gateway.recommend(&request).await)
    }

    /// Compliance check for an order the user might place.
    ///
    /// Inputs are validated exactly as `place_order` would, but nothing is
    /// placed.
    pub async fn check_compliance(
        &self,
        user_id: &str,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        limit_price: Decimal,
    ) -> EngineResult<Advisory<ComplianceReport>> {
        let user = self.engine.get_user(user_id)?;
        let request = ComplianceRequest {
            user_id: user.id,
            quantity: Quantity::new(quantity)?,
            limit_price: Price::new(limit_price)?,
            symbol: Symbol::parse(symbol)?,
            side,
        };
        debug!(user_id = %request.user_id, symbol = %request.symbol, "Compliance check requested");
        Ok(self.gateway.check_compliance(&request).await)
    }

    /// Security status of a user.
    pub async fn security_status(&self, user_id: &str) -> EngineResult<Advisory<SecurityStatus>> {
        let user = self.engine.get_user(user_id)?;
        let request = SecurityRequest { user_id: user.id };
        Ok(self.gateway.security_status(&request).await)
    }
}
