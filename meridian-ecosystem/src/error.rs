//! Ecosystem error types.
//!
//! These never leave the gateway: every failure is folded into an
//! [`Advisory::Unavailable`](crate::Advisory::Unavailable) result.

use thiserror::Error;

use crate::ports::UnavailableReason;

/// Errors raised by advisory adapters.
#[derive(Debug, Clone, Error)]
pub enum EcosystemError {
    /// Capability has no endpoint configured
    #[error("Capability not configured: {0}")]
    NotConfigured(String),

    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// Service answered with a non-success status
    #[error("Service error: HTTP {status} - {body}")]
    ServiceError { status: u16, body: String },

    /// Response body could not be decoded
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Response decoded but violates the result contract
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,
}

impl EcosystemError {
    /// How this failure is reported to callers.
    pub fn reason(&self) -> UnavailableReason {
        match self {
            EcosystemError::NotConfigured(_) => UnavailableReason::Disabled,
            EcosystemError::RequestFailed(_) => UnavailableReason::Unreachable,
            EcosystemError::Timeout => UnavailableReason::Timeout,
            EcosystemError::ServiceError { .. }
            | EcosystemError::ParseError(_)
            | EcosystemError::InvalidResponse(_) => UnavailableReason::Failed,
        }
    }
}
