//! Ecosystem configuration.
//!
//! Keys follow the camelCase layout used by external configuration files
//! (`ai.apiKey`, `globalSouth.offlineMode`, ...).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default bound for the start-up probe of each capability
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2_000;

/// Default bound for a single advisory call
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Default lifetime of a cached advisory result
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Settings shared by every remote capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CapabilityConfig {
    /// Whether the capability is used at all
    pub enabled: bool,
    /// Base URL of the remote service
    pub endpoint: Option<String>,
    /// Bearer credential sent with each request
    pub api_key: Option<String>,
}

impl CapabilityConfig {
    /// Enabled capability at `endpoint` without a credential.
    pub fn enabled_at(endpoint: impl Into<String>) -> Self {
        Self {
            enabled: true,
            endpoint: Some(endpoint.into()),
            api_key: None,
        }
    }
}

/// AI risk assessment and trade recommendation.
pub type AiConfig = CapabilityConfig;

/// Compliance checks.
pub type ComplianceConfig = CapabilityConfig;

/// Security status.
pub type SecurityConfig = CapabilityConfig;

/// Connection strategy for constrained networks.
///
/// These flags change how the gateway talks to remote services, never what
/// the trading core computes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GlobalSouthConfig {
    /// Never contact remote services; answer from the local cache only
    pub offline_mode: bool,
    /// Ask services for compact payloads
    pub low_bandwidth: bool,
    /// Keep successful results for `cache_ttl`
    pub local_caching: bool,
}

/// Full gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EcosystemConfig {
    pub ai: AiConfig,
    pub compliance: ComplianceConfig,
    pub security: SecurityConfig,
    pub global_south: GlobalSouthConfig,
    pub probe_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub cache_ttl_secs: u64,
}

impl EcosystemConfig {
    /// Every capability disabled.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Bound for each start-up probe
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Bound for each advisory call
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Lifetime of a cached result
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// True if at least one capability is enabled.
    pub fn any_enabled(&self) -> bool {
        self.ai.enabled || self.compliance.enabled || self.security.enabled
    }
}

impl Default for EcosystemConfig {
    fn default() -> Self {
        Self {
            ai: AiConfig::default(),
            compliance: ComplianceConfig::default(),
            security: SecurityConfig::default(),
            global_south: GlobalSouthConfig::default(),
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}
