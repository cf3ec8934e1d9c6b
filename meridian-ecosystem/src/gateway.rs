//! Ecosystem Gateway.
//!
//! Fronts an [`AdvisoryPort`] with per-capability enablement, a start-up
//! probe, call timeouts and the local cache. Every getter returns an
//! [`Advisory`]; nothing here ever fails the caller.
//!
//! ```text
//! connect ─► probe each enabled capability (bounded) ─► state table
//!
//! call(capability)
//!   Disabled     ─► Unavailable(disabled)
//!   Unreachable  ─► Unavailable(unreachable)
//!   Offline      ─► cached value (any age) or Unavailable(offline)
//!   Enabled      ─► fresh cache hit, else port call under timeout,
//!                   falling back to a stale cache entry on failure
//! ```

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::cache::{AdvisoryCache, Cached};
use crate::config::EcosystemConfig;
use crate::error::EcosystemError;
use crate::ports::{
    Advisory, AdvisoryPort, AiInsight, Capability, ComplianceReport, ComplianceRequest,
    RecommendationRequest, RiskRequest, SecurityRequest, SecurityStatus, UnavailableReason,
};

// =============================================================================
// Status
// =============================================================================

/// State of one capability, fixed at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityState {
    /// Probe succeeded; calls go to the service
    Enabled,
    /// Switched off in configuration
    Disabled,
    /// Probe failed or timed out
    Unreachable,
    /// Offline mode; served from the local cache only
    Offline,
}

/// How the gateway talks to services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMode {
    Online,
    LowBandwidth,
    Offline,
}

/// Snapshot reported by [`EcosystemGateway::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayStatus {
    pub mode: ConnectionMode,
    pub local_caching: bool,
    pub capabilities: BTreeMap<Capability, CapabilityState>,
}

// =============================================================================
// Gateway
// =============================================================================

/// Advisory side-channel to external services.
pub struct EcosystemGateway {
    port: Arc<dyn AdvisoryPort>,
    config: EcosystemConfig,
    states: BTreeMap<Capability, CapabilityState>,
    cache: AdvisoryCache,
}

impl EcosystemGateway {
    /// Create a gateway and probe each enabled capability once.
    ///
    /// Each probe is bounded by `probe_timeout`; a failed probe marks the
    /// capability unreachable for the life of the gateway.
    pub async fn connect(config: EcosystemConfig, port: Arc<dyn AdvisoryPort>) -> Self {
        let mut states = BTreeMap::new();

        for capability in Capability::ALL {
            let state = if !Self::configured_enabled(&config, capability) {
                CapabilityState::Disabled
            } else if config.global_south.offline_mode {
                CapabilityState::Offline
            } else {
                match timeout(config.probe_timeout(), port.probe(capability)).await {
                    Ok(Ok(())) => CapabilityState::Enabled,
                    Ok(Err(err)) => {
                        warn!(%capability, error = %err, "Capability probe failed");
                        CapabilityState::Unreachable
                    },
                    Err(_) => {
                        warn!(%capability, timeout_ms = config.probe_timeout_ms, "Capability probe timed out");
                        CapabilityState::Unreachable
                    },
                }
            };
            debug!(%capability, ?state, "Capability initialized");
            states.insert(capability, state);
        }

        let cache = AdvisoryCache::new(config.cache_ttl());
        let gateway = Self {
            port,
            config,
            states,
            cache,
        };

        info!(
            mode = ?gateway.mode(),
            enabled = gateway.count(CapabilityState::Enabled),
            unreachable = gateway.count(CapabilityState::Unreachable),
            "Ecosystem gateway ready"
        );

        gateway
    }

    /// Gateway with every capability disabled. Never contacts anything.
    pub fn disabled(port: Arc<dyn AdvisoryPort>) -> Self {
        let config = EcosystemConfig::disabled();
        let states = Capability::ALL.into_iter().map(|c| (c, CapabilityState::Disabled)).collect();
        let cache = AdvisoryCache::new(config.cache_ttl());
        Self {
            port,
            config,
            states,
            cache,
        }
    }

    fn configured_enabled(config: &EcosystemConfig, capability: Capability) -> bool {
        match capability {
            Capability::RiskAssessment | Capability::TradeRecommendation => config.ai.enabled,
            Capability::Compliance => config.compliance.enabled,
            Capability::Security => config.security.enabled,
        }
    }

    fn count(&self, state: CapabilityState) -> usize {
        self.states.values().filter(|s| **s == state).count()
    }

    fn mode(&self) -> ConnectionMode {
        let global_south = &self.config.global_south;
        if global_south.offline_mode {
            ConnectionMode::Offline
        } else if global_south.low_bandwidth {
            ConnectionMode::LowBandwidth
        } else {
            ConnectionMode::Online
        }
    }

    /// State of one capability
    pub fn state(&self, capability: Capability) -> CapabilityState {
        self.states.get(&capability).copied().unwrap_or(CapabilityState::Disabled)
    }

    /// Per-capability state and connection mode.
    pub fn status(&self) -> GatewayStatus {
        GatewayStatus {
            mode: self.mode(),
            local_caching: self.config.global_south.local_caching,
            capabilities: self.states.clone(),
        }
    }

    /// Cache used by this gateway
    pub fn cache(&self) -> &AdvisoryCache {
        &self.cache
    }

    // =========================================================================
    // Advisory getters
    // =========================================================================

    /// AI risk score for a portfolio.
    pub async fn assess_risk(&self, request: &RiskRequest) -> Advisory<AiInsight> {
        let key = request.cache_key();
        self.call(Capability::RiskAssessment, &key, || self.port.assess_risk(request)).await
    }

    /// AI recommendation for a symbol.
    pub async fn recommend(&self, request: &RecommendationRequest) -> Advisory<AiInsight> {
        let key = request.cache_key();
        self.call(Capability::TradeRecommendation, &key, || self.port.recommend(request)).await
    }

    /// Compliance check for a prospective order.
    pub async fn check_compliance(&self, request: &ComplianceRequest) -> Advisory<ComplianceReport> {
        let key = request.cache_key();
        self.call(Capability::Compliance, &key, || self.port.check_compliance(request)).await
    }

    /// Security status of a user.
    pub async fn security_status(&self, request: &SecurityRequest) -> Advisory<SecurityStatus> {
        let key = request.cache_key();
        self.call(Capability::Security, &key, || self.port.security_status(request)).await
    }

    async fn call<T, F, Fut>(&self, capability: Capability, key: &str, request: F) -> Advisory<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, EcosystemError>>,
    {
        match self.state(capability) {
            CapabilityState::Disabled => return Advisory::unavailable(UnavailableReason::Disabled),
            CapabilityState::Unreachable => {
                return Advisory::unavailable(UnavailableReason::Unreachable)
            },
            CapabilityState::Offline => {
                return match self.cache.get::<T>(capability, key).any() {
                    Some(value) => {
                        debug!(%capability, key, "Offline: served from cache");
                        Advisory::Available(value)
                    },
                    None => Advisory::unavailable(UnavailableReason::Offline),
                };
            },
            CapabilityState::Enabled => {},
        }

        let caching = self.config.global_south.local_caching;
        let cached = if caching {
            self.cache.get::<T>(capability, key)
        } else {
            Cached::Miss
        };
        if let Cached::Fresh(_) = cached {
            debug!(%capability, key, "Served from cache");
            return match cached.any() {
                Some(value) => Advisory::Available(value),
                None => Advisory::unavailable(UnavailableReason::Failed),
            };
        }

        let failure = match timeout(self.config.request_timeout(), request()).await {
            Ok(Ok(value)) => {
                if caching {
                    self.cache.store(capability, key, &value);
                }
                return Advisory::Available(value);
            },
            Ok(Err(err)) => {
                warn!(%capability, error = %err, "Advisory call failed");
                err.reason()
            },
            Err(_) => {
                warn!(%capability, timeout_ms = self.config.request_timeout_ms, "Advisory call timed out");
                UnavailableReason::Timeout
            },
        };

        match cached.any() {
            Some(value) => {
                debug!(%capability, key, "Served stale cache entry after failure");
                Advisory::Available(value)
            },
            None => Advisory::unavailable(failure),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::{CapabilityConfig, GlobalSouthConfig};
    use crate::stub::StubAdvisory;
    use meridian_domain::{OrderSide, Portfolio, Price, Quantity, Symbol, UserId};
    use rust_decimal_macros::dec;

    fn all_enabled() -> EcosystemConfig {
        EcosystemConfig {
            ai: CapabilityConfig::enabled_at("http://ai.local"),
            compliance: CapabilityConfig::enabled_at("http://compliance.local"),
            security: CapabilityConfig::enabled_at("http://security.local"),
            ..EcosystemConfig::default()
        }
    }

    fn user() -> UserId {
        UserId::new("u1").unwrap()
    }

    fn risk_request() -> RiskRequest {
        RiskRequest {
            user_id: user(),
            portfolio: Portfolio::new(user(), dec!(0)),
        }
    }

    fn security_request() -> SecurityRequest {
        SecurityRequest { user_id: user() }
    }

    fn compliance_request() -> ComplianceRequest {
        ComplianceRequest {
            user_id: user(),
            symbol: Symbol::parse("GOLD").unwrap(),
            side: OrderSide::Buy,
            quantity: Quantity::new(dec!(100)).unwrap(),
            limit_price: Price::new(dec!(1950.50)).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_all_enabled_answers() {
        let stub = Arc::new(StubAdvisory::new());
        let gateway = EcosystemGateway::connect(all_enabled(), stub.clone()).await;

        assert!(gateway.assess_risk(&risk_request()).await.is_available());
        assert!(gateway.check_compliance(&compliance_request()).await.is_available());
        assert!(gateway.security_status(&security_request()).await.is_available());
        assert_eq!(stub.call_count(), 3);

        let status = gateway.status();
        assert_eq!(status.mode, ConnectionMode::Online);
        assert!(status.capabilities.values().all(|s| *s == CapabilityState::Enabled));
    }

    #[tokio::test]
    async fn test_disabled_ai_leaves_others_working() {
        let mut config = all_enabled();
        config.ai.enabled = false;
        let stub = Arc::new(StubAdvisory::new());
        let gateway = EcosystemGateway::connect(config, stub.clone()).await;

        let risk = gateway.assess_risk(&risk_request()).await;
        assert_eq!(risk.reason(), Some(UnavailableReason::Disabled));
        assert_eq!(gateway.state(Capability::TradeRecommendation), CapabilityState::Disabled);

        assert!(gateway.check_compliance(&compliance_request()).await.is_available());
        assert!(gateway.security_status(&security_request()).await.is_available());
        assert_eq!(stub.call_count(), 2);
    }

    #[tokio::test]
    async fn test_disabled_gateway_never_calls_port() {
        let stub = Arc::new(StubAdvisory::new());
        let gateway = EcosystemGateway::disabled(stub.clone());

        assert!(!gateway.assess_risk(&risk_request()).await.is_available());
        assert!(!gateway.security_status(&security_request()).await.is_available());
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_probe() {
        let stub = Arc::new(StubAdvisory::new());
        stub.set_unreachable(Capability::Security);
        let gateway = EcosystemGateway::connect(all_enabled(), stub.clone()).await;

        assert_eq!(gateway.state(Capability::Security), CapabilityState::Unreachable);
        let result = gateway.security_status(&security_request()).await;
        assert_eq!(result.reason(), Some(UnavailableReason::Unreachable));
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_service_times_out() {
        let mut config = all_enabled();
        config.request_timeout_ms = 100;
        let stub = Arc::new(StubAdvisory::new());
        stub.set_latency(Duration::from_secs(10));
        let gateway = EcosystemGateway::connect(config, stub).await;

        let result = gateway.security_status(&security_request()).await;
        assert_eq!(result.reason(), Some(UnavailableReason::Timeout));
    }

    #[tokio::test]
    async fn test_service_failure_is_absorbed() {
        let stub = Arc::new(StubAdvisory::new());
        let gateway = EcosystemGateway::connect(all_enabled(), stub.clone()).await;

        stub.set_fail_next(true);
        let result = gateway.check_compliance(&compliance_request()).await;
        assert_eq!(result.reason(), Some(UnavailableReason::Failed));
    }

    #[tokio::test]
    async fn test_local_caching_reuses_results() {
        let mut config = all_enabled();
        config.global_south = GlobalSouthConfig {
            local_caching: true,
            ..GlobalSouthConfig::default()
        };
        let stub = Arc::new(StubAdvisory::new());
        let gateway = EcosystemGateway::connect(config, stub.clone()).await;

        let first = gateway.security_status(&security_request()).await;
        let second = gateway.security_status(&security_request()).await;
        assert_eq!(first, second);
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_covers_failure() {
        let mut config = all_enabled();
        config.cache_ttl_secs = 0;
        config.global_south.local_caching = true;
        let stub = Arc::new(StubAdvisory::new());
        let gateway = EcosystemGateway::connect(config, stub.clone()).await;

        let first = gateway.security_status(&security_request()).await;
        assert!(first.is_available());

        std::thread::sleep(Duration::from_millis(2));
        stub.set_fail_next(true);
        let second = gateway.security_status(&security_request()).await;
        assert_eq!(first, second);
        assert_eq!(stub.call_count(), 2);
    }

    #[tokio::test]
    async fn test_offline_mode_serves_cache_only() {
        let mut config = all_enabled();
        config.global_south = GlobalSouthConfig {
            offline_mode: true,
            local_caching: true,
            ..GlobalSouthConfig::default()
        };
        let stub = Arc::new(StubAdvisory::new());
        stub.set_unreachable(Capability::Security);
        let gateway = EcosystemGateway::connect(config, stub.clone()).await;

        assert_eq!(gateway.state(Capability::Security), CapabilityState::Offline);
        assert_eq!(gateway.status().mode, ConnectionMode::Offline);

        let miss = gateway.security_status(&security_request()).await;
        assert_eq!(miss.reason(), Some(UnavailableReason::Offline));

        let seeded = SecurityStatus {
            authenticated: true,
            permissions: Default::default(),
            risk_level: crate::ports::RiskLevel::Medium,
            timestamp: chrono::Utc::now(),
        };
        gateway.cache().store(Capability::Security, "u1", &seeded);

        let hit = gateway.security_status(&security_request()).await;
        assert_eq!(hit, Advisory::Available(seeded));
        assert_eq!(stub.call_count(), 0);
    }
}
