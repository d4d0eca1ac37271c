//! Risk analysis service adapter

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{DomainPort, Money, PortError};
use domain_claims::{Claim, RiskAnalysis, RiskScorer};

/// Configuration for the risk analysis HTTP adapter
#[derive(Debug, Clone)]
pub struct RiskScorerConfig {
    /// Base URL of the analysis service, e.g. `http://risk.internal/api/v1`
    pub base_url: String,
    /// Bearer token
    pub api_key: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl RiskScorerConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_secs: 30,
        }
    }
}

/// HTTP client for the external claim analysis service
///
/// A single analysis call per claim; the orchestrator treats any failure
/// here as "inconclusive", never as a rejection.
pub struct HttpRiskScorer {
    client: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    correlation_id: String,
    claim_type: String,
    requested_amount: Decimal,
    currency: String,
    description: &'a str,
    evidence_refs: Vec<&'a str>,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    fraud_score: Decimal,
    authenticity_score: Decimal,
    confidence: Decimal,
    suggested_amount: Decimal,
}

impl HttpRiskScorer {
    pub fn new(config: RiskScorerConfig) -> Result<Self, PortError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|_| PortError::validation("invalid characters in risk API key"))?,
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| PortError::internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_secs * 1000,
        })
    }

    fn map_send_error(&self, operation: &str, e: reqwest::Error) -> PortError {
        if e.is_timeout() {
            PortError::timeout(operation.to_string(), self.timeout_ms)
        } else {
            PortError::Connection {
                message: format!("{operation}: {e}"),
                source: Some(Box::new(e)),
            }
        }
    }
}

impl DomainPort for HttpRiskScorer {}

#[async_trait]
impl RiskScorer for HttpRiskScorer {
    async fn analyze(&self, claim: &Claim) -> Result<RiskAnalysis, PortError> {
        let url = format!("{}/analyze-claim", self.base_url);
        let body = AnalyzeRequest {
            correlation_id: claim.correlation_id.to_string(),
            claim_type: claim.claim_type.to_string(),
            requested_amount: claim.requested_amount.amount(),
            currency: claim.requested_amount.currency().to_string(),
            description: &claim.description,
            evidence_refs: claim.evidence_refs.iter().map(|e| e.as_str()).collect(),
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error("analyze_claim", e))?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(PortError::ServiceUnavailable {
                service: format!("risk analysis: HTTP {status}"),
            });
        }
        if status.is_client_error() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PortError::validation(format!(
                "analyze_claim: HTTP {status}: {text}"
            )));
        }

        let parsed: AnalyzeResponse = resp
            .json()
            .await
            .map_err(|e| PortError::internal(format!("analyze_claim: malformed response: {e}")))?;

        Ok(RiskAnalysis {
            fraud_score: parsed.fraud_score,
            authenticity_score: parsed.authenticity_score,
            confidence: parsed.confidence,
            suggested_amount: Money::new(
                parsed.suggested_amount,
                claim.requested_amount.currency(),
            ),
        })
    }
}
