//! Advisory port definitions.
//!
//! The port is the seam to external advisory services. Adapters implement
//! it for a specific transport (HTTP, stub). Result types use the camelCase
//! wire shapes the services speak.

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use meridian_domain::{OrderSide, Portfolio, Position, Price, Quantity, Symbol, UserId};

use crate::error::EcosystemError;

// =============================================================================
// Capabilities
// =============================================================================

/// One independently-enableable advisory function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// AI portfolio risk scoring
    RiskAssessment,
    /// AI trade recommendation for a symbol
    TradeRecommendation,
    /// Pre-trade compliance check
    Compliance,
    /// User security status
    Security,
}

impl Capability {
    /// All capabilities, in probe order.
    pub const ALL: [Capability; 4] = [
        Capability::RiskAssessment,
        Capability::TradeRecommendation,
        Capability::Compliance,
        Capability::Security,
    ];

    /// Stable name used in logs and paths
    pub fn name(&self) -> &'static str {
        match self {
            Capability::RiskAssessment => "risk_assessment",
            Capability::TradeRecommendation => "trade_recommendation",
            Capability::Compliance => "compliance",
            Capability::Security => "security",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Advisory results
// =============================================================================

/// Why an advisory result is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// Capability switched off in configuration
    Disabled,
    /// Start-up probe or request could not reach the service
    Unreachable,
    /// Call exceeded its time bound
    Timeout,
    /// Offline mode and nothing cached
    Offline,
    /// Service answered with an error or an invalid payload
    Failed,
}

/// Result of an advisory call: a value, or an explicit absence.
///
/// Never an error. Callers can always proceed without the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Advisory<T> {
    /// Service answered
    Available(T),
    /// No answer, with the reason
    Unavailable {
        /// Why no value is present
        reason: UnavailableReason,
    },
}

impl<T> Advisory<T> {
    /// Absent result with `reason`.
    pub fn unavailable(reason: UnavailableReason) -> Self {
        Advisory::Unavailable { reason }
    }

    /// Check if a value is present
    pub fn is_available(&self) -> bool {
        matches!(self, Advisory::Available(_))
    }

    /// The value, if any
    pub fn value(self) -> Option<T> {
        match self {
            Advisory::Available(value) => Some(value),
            Advisory::Unavailable { .. } => None,
        }
    }

    /// The reason for absence, if absent
    pub fn reason(&self) -> Option<UnavailableReason> {
        match self {
            Advisory::Available(_) => None,
            Advisory::Unavailable { reason } => Some(*reason),
        }
    }
}

/// AI risk assessment or trade recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiInsight {
    /// 0 (no risk) to 100 (maximum risk)
    pub risk_score: u8,
    /// 0 to 1
    pub confidence: Decimal,
    /// Ordered, most important first
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl AiInsight {
    /// Check the documented ranges.
    pub fn validate(self) -> Result<Self, EcosystemError> {
        if self.risk_score > 100 {
            return Err(EcosystemError::InvalidResponse(format!(
                "riskScore {} outside 0-100",
                self.risk_score
            )));
        }
        if self.confidence < Decimal::ZERO || self.confidence > Decimal::ONE {
            return Err(EcosystemError::InvalidResponse(format!(
                "confidence {} outside 0-1",
                self.confidence
            )));
        }
        Ok(self)
    }
}

/// Individual compliance check outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceChecks {
    pub kyc: bool,
    pub aml: bool,
    pub trading: bool,
    pub risk: bool,
}

impl ComplianceChecks {
    /// True if every check passed
    pub fn all_passed(&self) -> bool {
        self.kyc && self.aml && self.trading && self.risk
    }
}

/// Compliance check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub compliant: bool,
    pub checks: ComplianceChecks,
    pub warnings: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Coarse risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Security status of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityStatus {
    pub authenticated: bool,
    pub permissions: BTreeSet<String>,
    pub risk_level: RiskLevel,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Requests
// =============================================================================

/// Portfolio risk scoring request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskRequest {
    pub user_id: UserId,
    pub portfolio: Portfolio,
}

impl RiskRequest {
    /// Cache key: a portfolio only changes when a trade is applied.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.user_id, self.portfolio.trade_count)
    }
}

/// Trade recommendation request for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub user_id: UserId,
    pub symbol: Symbol,
    /// Current holding, if any
    pub position: Option<Position>,
}

impl RecommendationRequest {
    pub fn cache_key(&self) -> String {
        let held = self.position.as_ref().map(|p| p.quantity).unwrap_or_default();
        format!("{}:{}:{}", self.user_id, self.symbol, held)
    }
}

/// Pre-trade compliance check for a prospective order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceRequest {
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Quantity,
    pub limit_price: Price,
}

impl ComplianceRequest {
    pub fn cache_key(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.user_id, self.symbol, self.side, self.quantity, self.limit_price
        )
    }
}

/// Security status request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRequest {
    pub user_id: UserId,
}

impl SecurityRequest {
    pub fn cache_key(&self) -> String {
        self.user_id.to_string()
    }
}

// =============================================================================
// Advisory Port
// =============================================================================

/// Port for external advisory services.
///
/// Implementations:
/// - `HttpAdvisoryClient` - JSON over HTTP
/// - `StubAdvisory` - Fixed responses for testing and local runs
///
/// Adapters return errors freely; the gateway turns them into
/// [`Advisory::Unavailable`].
#[async_trait]
pub trait AdvisoryPort: Send + Sync {
    /// Check that the service behind `capability` is reachable.
    async fn probe(&self, capability: Capability) -> Result<(), EcosystemError>;

    /// Score the risk of a portfolio.
    async fn assess_risk(&self, request: &RiskRequest) -> Result<AiInsight, EcosystemError>;

    /// Recommend what to do with a symbol.
    async fn recommend(&self, request: &RecommendationRequest)
        -> Result<AiInsight, EcosystemError>;

    /// Check a prospective order against compliance rules.
    async fn check_compliance(
        &self,
        request: &ComplianceRequest,
    ) -> Result<ComplianceReport, EcosystemError>;

    /// Report a user's security status.
    async fn security_status(
        &self,
        request: &SecurityRequest,
    ) -> Result<SecurityStatus, EcosystemError>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn insight(risk_score: u8, confidence: Decimal) -> AiInsight {
        AiInsight {
            risk_score,
            confidence,
            recommendations: vec!["Diversify".to_string()],
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_insight_ranges() {
        assert!(insight(0, dec!(0)).validate().is_ok());
        assert!(insight(100, dec!(1)).validate().is_ok());
        assert!(insight(101, dec!(0.5)).validate().is_err());
        assert!(insight(50, dec!(1.01)).validate().is_err());
        assert!(insight(50, dec!(-0.1)).validate().is_err());
    }

    #[test]
    fn test_insight_wire_shape() {
        let json = r#"{
            "riskScore": 42,
            "confidence": "0.85",
            "recommendations": ["Reduce GOLD exposure", "Hold cash"],
            "timestamp": "2024-01-15T10:00:00Z"
        }"#;

        let parsed: AiInsight = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.risk_score, 42);
        assert_eq!(parsed.confidence, dec!(0.85));
        assert_eq!(parsed.recommendations[0], "Reduce GOLD exposure");
    }

    #[test]
    fn test_advisory_serialization() {
        let absent: Advisory<SecurityStatus> = Advisory::unavailable(UnavailableReason::Disabled);
        let json = serde_json::to_value(&absent).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["reason"], "disabled");

        let present = Advisory::Available(SecurityStatus {
            authenticated: true,
            permissions: BTreeSet::from(["trade".to_string()]),
            risk_level: RiskLevel::Low,
            timestamp: Utc::now(),
        });
        let json = serde_json::to_value(&present).unwrap();
        assert_eq!(json["status"], "available");
        assert_eq!(json["riskLevel"], "low");
        assert_eq!(json["permissions"][0], "trade");
    }

    #[test]
    fn test_advisory_accessors() {
        let present: Advisory<u8> = Advisory::Available(7);
        assert!(present.is_available());
        assert_eq!(present.reason(), None);
        assert_eq!(present.value(), Some(7));

        let absent: Advisory<u8> = Advisory::unavailable(UnavailableReason::Timeout);
        assert_eq!(absent.reason(), Some(UnavailableReason::Timeout));
        assert_eq!(absent.value(), None);
    }
}
