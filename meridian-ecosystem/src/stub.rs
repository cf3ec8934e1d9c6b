//! Stub advisory service for testing.
//!
//! Answers every capability with fixed, deterministic results. Failures,
//! unreachable services and latency can be injected per test.

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::error::EcosystemError;
use crate::ports::{
    AdvisoryPort, AiInsight, Capability, ComplianceChecks, ComplianceReport, ComplianceRequest,
    RecommendationRequest, RiskLevel, RiskRequest, SecurityRequest, SecurityStatus,
};

/// Stub advisory service.
pub struct StubAdvisory {
    /// Capabilities whose probe fails
    unreachable: RwLock<HashSet<Capability>>,
    /// Delay applied to every call
    latency: RwLock<Option<Duration>>,
    /// Whether the next call fails
    fail_next: RwLock<bool>,
    /// Advisory calls served (probes excluded)
    calls: AtomicUsize,
}

impl StubAdvisory {
    pub fn new() -> Self {
        Self {
            unreachable: RwLock::new(HashSet::new()),
            latency: RwLock::new(None),
            fail_next: RwLock::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make the probe for `capability` fail.
    pub fn set_unreachable(&self, capability: Capability) {
        self.unreachable.write().insert(capability);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = Some(latency);
    }

    /// Configure the next call to fail.
    pub fn set_fail_next(&self, fail: bool) {
        *self.fail_next.write() = fail;
    }

    /// Number of advisory calls answered or failed so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Check if we should fail the next operation.
    fn should_fail(&self) -> bool {
        let mut fail_next = self.fail_next.write();
        let fail = *fail_next;
        *fail_next = false;
        fail
    }

    /// Common path for every advisory call.
    async fn enter(&self) -> Result<(), EcosystemError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.should_fail() {
            return Err(EcosystemError::ServiceError {
                status: 503,
                body: "Simulated service failure".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for StubAdvisory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdvisoryPort for StubAdvisory {
    async fn probe(&self, capability: Capability) -> Result<(), EcosystemError> {
        if self.unreachable.read().contains(&capability) {
            return Err(EcosystemError::RequestFailed(format!("Stub: {} unreachable", capability)));
        }
        Ok(())
    }

    async fn assess_risk(&self, request: &RiskRequest) -> Result<AiInsight, EcosystemError> {
        self.enter().await?;

        // Ten points per open position, twenty more if any is short
        let positions = &request.portfolio.positions;
        let mut score = positions.len().saturating_mul(10).min(80);
        if positions.values().any(|p| p.is_short()) {
            score += 20;
        }

        let mut recommendations = Vec::new();
        if positions.len() < 3 {
            recommendations.push("Diversify across more symbols".to_string());
        }
        if request.portfolio.cash_balance < Decimal::ZERO {
            recommendations.push("Restore a non-negative cash balance".to_string());
        }

        Ok(AiInsight {
            risk_score: score as u8,
            confidence: Decimal::new(8, 1),
            recommendations,
            timestamp: Utc::now(),
        })
    }

    async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<AiInsight, EcosystemError> {
        self.enter().await?;

        let recommendation = match &request.position {
            Some(position) if position.is_short() => format!("Consider covering {}", request.symbol),
            Some(_) => format!("Hold {}", request.symbol),
            None => format!("No position in {}", request.symbol),
        };

        Ok(AiInsight {
            risk_score: 50,
            confidence: Decimal::new(5, 1),
            recommendations: vec![recommendation],
            timestamp: Utc::now(),
        })
    }

    async fn check_compliance(
        &self,
        request: &ComplianceRequest,
    ) -> Result<ComplianceReport, EcosystemError> {
        self.enter().await?;

        // Too large to represent is certainly a large order
        let notional = request.quantity.notional(request.limit_price).unwrap_or(Decimal::MAX);
        let mut warnings = Vec::new();
        if notional > Decimal::new(1_000_000, 0) {
            warnings.push(format!("Large order notional: {}", notional));
        }

        let checks = ComplianceChecks {
            kyc: true,
            aml: true,
            trading: true,
            risk: warnings.is_empty(),
        };

        Ok(ComplianceReport {
            compliant: checks.all_passed(),
            checks,
            warnings,
            timestamp: Utc::now(),
        })
    }

    async fn security_status(
        &self,
        _request: &SecurityRequest,
    ) -> Result<SecurityStatus, EcosystemError> {
        self.enter().await?;

        Ok(SecurityStatus {
            authenticated: true,
            permissions: BTreeSet::from(["read".to_string(), "trade".to_string()]),
            risk_level: RiskLevel::Low,
            timestamp: Utc::now(),
        })
    }
}
