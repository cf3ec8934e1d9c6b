//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::str::FromStr;

use meridian_domain::ShortSellPolicy;
use meridian_ecosystem::{CapabilityConfig, EcosystemConfig, GlobalSouthConfig};
use meridian_engine::EngineConfig;
use rust_decimal::Decimal;

use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Engine configuration
    pub engine: EngineConfig,

    /// Ecosystem gateway configuration
    pub ecosystem: EcosystemConfig,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (stub advisory services)
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let environment = Self::load_environment()?;
        let api = Self::load_api_config()?;
        let engine = Self::load_engine_config()?;
        let ecosystem = Self::load_ecosystem_config()?;

        Ok(Self {
            api,
            engine,
            ecosystem,
            environment,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            engine: EngineConfig::default(),
            ecosystem: EcosystemConfig::disabled(),
            environment: Environment::Test,
        }
    }

    fn load_environment() -> DaemonResult<Environment> {
        let env_str = env::var("MERIDIAN_ENV").unwrap_or_else(|_| "development".to_string());
        parse_environment(&env_str)
    }

    fn load_api_config() -> DaemonResult<ApiConfig> {
        let host = env::var("MERIDIAN_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port_str = env::var("MERIDIAN_API_PORT").unwrap_or_else(|_| "8080".to_string());

        let port = port_str
            .parse::<u16>()
            .map_err(|_| DaemonError::Config(format!("Invalid MERIDIAN_API_PORT: {}", port_str)))?;

        Ok(ApiConfig { host, port })
    }

    fn load_engine_config() -> DaemonResult<EngineConfig> {
        let initial_cash = Self::load_decimal_env("MERIDIAN_INITIAL_CASH", Decimal::ZERO)?;
        let short_selling = if Self::load_bool_env("MERIDIAN_ALLOW_SHORT_SELLING", false)? {
            ShortSellPolicy::Allowed
        } else {
            ShortSellPolicy::Disabled
        };

        Ok(EngineConfig {
            initial_cash,
            short_selling,
        })
    }

    fn load_ecosystem_config() -> DaemonResult<EcosystemConfig> {
        let defaults = EcosystemConfig::default();
        let request_timeout_ms =
            Self::load_u64_env("MERIDIAN_ECOSYSTEM_TIMEOUT_MS", defaults.request_timeout_ms)?;

        Ok(EcosystemConfig {
            ai: Self::load_capability("AI")?,
            compliance: Self::load_capability("COMPLIANCE")?,
            security: Self::load_capability("SECURITY")?,
            global_south: GlobalSouthConfig {
                offline_mode: Self::load_bool_env("MERIDIAN_OFFLINE_MODE", false)?,
                low_bandwidth: Self::load_bool_env("MERIDIAN_LOW_BANDWIDTH", false)?,
                local_caching: Self::load_bool_env("MERIDIAN_LOCAL_CACHING", false)?,
            },
            probe_timeout_ms: request_timeout_ms.min(defaults.probe_timeout_ms),
            request_timeout_ms,
            cache_ttl_secs: defaults.cache_ttl_secs,
        })
    }

    /// `MERIDIAN_{name}_ENABLED`, `_ENDPOINT` and `_API_KEY`.
    fn load_capability(name: &str) -> DaemonResult<CapabilityConfig> {
        let enabled_key = format!("MERIDIAN_{}_ENABLED", name);
        Ok(CapabilityConfig {
            enabled: Self::load_bool_env(&enabled_key, false)?,
            endpoint: env::var(format!("MERIDIAN_{}_ENDPOINT", name)).ok(),
            api_key: env::var(format!("MERIDIAN_{}_API_KEY", name)).ok(),
        })
    }

    fn load_decimal_env(key: &str, default: Decimal) -> DaemonResult<Decimal> {
        match env::var(key) {
            Ok(val) => Decimal::from_str(&val)
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }

    fn load_u64_env(key: &str, default: u64) -> DaemonResult<u64> {
        match env::var(key) {
            Ok(val) => val
                .parse::<u64>()
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }

    fn load_bool_env(key: &str, default: bool) -> DaemonResult<bool> {
        match env::var(key) {
            Ok(val) => parse_bool(key, &val),
            Err(_) => Ok(default),
        }
    }
}

fn parse_environment(raw: &str) -> DaemonResult<Environment> {
    match raw.to_lowercase().as_str() {
        "test" => Ok(Environment::Test),
        "development" | "dev" => Ok(Environment::Development),
        "production" | "prod" => Ok(Environment::Production),
        other => Err(DaemonError::Config(format!(
            "Invalid MERIDIAN_ENV: {}. Expected: test, development, production",
            other
        ))),
    }
}

fn parse_bool(key: &str, raw: &str) -> DaemonResult<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(DaemonError::Config(format!("Invalid {} value: {}", key, raw))),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            engine: EngineConfig::default(),
            ecosystem: EcosystemConfig::default(),
            environment: Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.api.port, 8080);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.engine.initial_cash, Decimal::ZERO);
        assert_eq!(config.engine.short_selling, ShortSellPolicy::Disabled);
        assert!(!config.ecosystem.any_enabled());
    }

    #[test]
    fn test_test_config() {
        let config = Config::test();

        assert_eq!(config.api.port, 0);
        assert_eq!(config.environment, Environment::Test);
    }

    #[test]
    fn test_parse_environment() {
        assert_eq!(parse_environment("PROD").unwrap(), Environment::Production);
        assert_eq!(parse_environment("dev").unwrap(), Environment::Development);
        assert!(matches!(parse_environment("staging"), Err(DaemonError::Config(_))));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("K", "true").unwrap());
        assert!(parse_bool("K", " 1 ").unwrap());
        assert!(!parse_bool("K", "off").unwrap());
        assert!(parse_bool("K", "maybe").is_err());
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Test.to_string(), "test");
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
