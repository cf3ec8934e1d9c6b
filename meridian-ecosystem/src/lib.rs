//! Meridian Ecosystem Gateway
//!
//! Optional advisory side-channel to external AI, compliance and security
//! services. Each capability is enabled independently, probed once at
//! start-up and bounded by a timeout on every call. Results are
//! [`Advisory`] values: a disabled, unreachable or slow service yields
//! `Advisory::Unavailable`, never an error.
//!
//! Nothing in the trading core depends on this crate. Callers invoke it
//! explicitly, off the order and portfolio path.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐   ┌──────────────┐   ┌──────────────────────┐
//! │ EcosystemGateway  │──►│ AdvisoryPort │◄──│ HttpAdvisoryClient   │
//! │ (states, timeout, │   └──────────────┘   │ StubAdvisory         │
//! │  AdvisoryCache)   │                      └──────────────────────┘
//! └───────────────────┘
//! ```

#![warn(clippy::all)]

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod ports;
pub mod stub;

pub use cache::{AdvisoryCache, Cached};
pub use config::{AiConfig, CapabilityConfig, ComplianceConfig, EcosystemConfig, GlobalSouthConfig, SecurityConfig};
pub use error::EcosystemError;
pub use gateway::{CapabilityState, ConnectionMode, EcosystemGateway, GatewayStatus};
pub use http::HttpAdvisoryClient;
pub use ports::{
    Advisory, AdvisoryPort, AiInsight, Capability, ComplianceChecks, ComplianceReport,
    ComplianceRequest, RecommendationRequest, RiskLevel, RiskRequest, SecurityRequest,
    SecurityStatus, UnavailableReason,
};
pub use stub::StubAdvisory;
