//! HTTP advisory client.
//!
//! Talks JSON to one base URL per capability group:
//!
//! | Capability           | Request                              |
//! |----------------------|--------------------------------------|
//! | probe                | `GET  {endpoint}/health`             |
//! | risk assessment      | `POST {ai}/risk`                     |
//! | trade recommendation | `POST {ai}/recommendation`           |
//! | compliance           | `POST {compliance}/check`            |
//! | security             | `POST {security}/status`             |
//!
//! Requests carry `Authorization: Bearer {apiKey}` when a key is set. In
//! low-bandwidth mode every request adds `compact=true` so services can
//! trim their payloads.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::timeout;
use tracing::debug;

use crate::config::{CapabilityConfig, EcosystemConfig};
use crate::error::EcosystemError;
use crate::ports::{
    AdvisoryPort, AiInsight, Capability, ComplianceReport, ComplianceRequest,
    RecommendationRequest, RiskRequest, SecurityRequest, SecurityStatus,
};

// =============================================================================
// Endpoint
// =============================================================================

/// Resolved service location.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Endpoint {
    base_url: String,
    api_key: Option<String>,
}

impl Endpoint {
    fn from_config(config: &CapabilityConfig) -> Option<Self> {
        let base_url = config.endpoint.as_deref()?.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return None;
        }
        Some(Self {
            base_url: base_url.to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }
}

// =============================================================================
// HTTP Client
// =============================================================================

/// Advisory client speaking JSON over HTTP.
pub struct HttpAdvisoryClient {
    client: Client,
    ai: Option<Endpoint>,
    compliance: Option<Endpoint>,
    security: Option<Endpoint>,
    low_bandwidth: bool,
    request_timeout: Duration,
}

impl HttpAdvisoryClient {
    /// Build a client from the gateway configuration.
    pub fn new(config: &EcosystemConfig) -> Self {
        Self {
            client: Client::new(),
            ai: Endpoint::from_config(&config.ai),
            compliance: Endpoint::from_config(&config.compliance),
            security: Endpoint::from_config(&config.security),
            low_bandwidth: config.global_south.low_bandwidth,
            request_timeout: config.request_timeout(),
        }
    }

    fn endpoint(&self, capability: Capability) -> Result<&Endpoint, EcosystemError> {
        let endpoint = match capability {
            Capability::RiskAssessment | Capability::TradeRecommendation => self.ai.as_ref(),
            Capability::Compliance => self.compliance.as_ref(),
            Capability::Security => self.security.as_ref(),
        };
        endpoint.ok_or_else(|| EcosystemError::NotConfigured(capability.to_string()))
    }

    /// Full URL for `path` under the capability's endpoint.
    fn url(&self, capability: Capability, path: &str) -> Result<String, EcosystemError> {
        let endpoint = self.endpoint(capability)?;
        let mut url = format!("{}{}", endpoint.base_url, path);
        if self.low_bandwidth {
            url.push_str("?compact=true");
        }
        Ok(url)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder, capability: Capability) -> reqwest::RequestBuilder {
        match self.endpoint(capability).ok().and_then(|e| e.api_key.as_deref()) {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Send a request and read the body of a successful response.
    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        capability: Capability,
    ) -> Result<String, EcosystemError> {
        let builder = self.authorize(builder, capability);

        let response = timeout(self.request_timeout, builder.send())
            .await
            .map_err(|_| EcosystemError::Timeout)?
            .map_err(|e| {
                if e.is_timeout() {
                    EcosystemError::Timeout
                } else {
                    EcosystemError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| EcosystemError::ParseError(e.to_string()))?;

        if !status.is_success() {
            return Err(EcosystemError::ServiceError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    async fn post_json<Req, Resp>(
        &self,
        capability: Capability,
        path: &str,
        request: &Req,
    ) -> Result<Resp, EcosystemError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = self.url(capability, path)?;
        debug!(%capability, %url, "Advisory request");

        let body = self.send(self.client.post(&url).json(request), capability).await?;
        serde_json::from_str(&body).map_err(|e| EcosystemError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl AdvisoryPort for HttpAdvisoryClient {
    async fn probe(&self, capability: Capability) -> Result<(), EcosystemError> {
        let url = self.url(capability, "/health")?;
        self.send(self.client.get(&url), capability).await?;
        Ok(())
    }

    async fn assess_risk(&self, request: &RiskRequest) -> Result<AiInsight, EcosystemError> {
        let insight: AiInsight = self.post_json(Capability::RiskAssessment, "/risk", request).await?;
        insight.validate()
    }

    async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<AiInsight, EcosystemError> {
        let insight: AiInsight =
            self.post_json(Capability::TradeRecommendation, "/recommendation", request).await?;
        insight.validate()
    }

    async fn check_compliance(
        &self,
        request: &ComplianceRequest,
    ) -> Result<ComplianceReport, EcosystemError> {
        self.post_json(Capability::Compliance, "/check", request).await
    }

    async fn security_status(
        &self,
        request: &SecurityRequest,
    ) -> Result<SecurityStatus, EcosystemError> {
        self.post_json(Capability::Security, "/status", request).await
    }
}

// =============================================================================
// Tests
// =============================================================================
