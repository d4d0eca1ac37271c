//! Ledger gateway adapter
//!
//! Prepares unsigned transaction payloads on the ledger gateway and polls
//! their observed state. The gateway holds the payloads; signing and
//! broadcast belong to an external signer and are out of scope here.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{CorrelationId, DomainPort, Money, PartyId, PortError};
use domain_claims::{Claim, LedgerGateway, LedgerState, PreparedRef};

use crate::retry::retry_send;

/// Configuration for the ledger gateway HTTP adapter
#[derive(Debug, Clone)]
pub struct LedgerGatewayConfig {
    /// Base URL of the gateway, e.g. `http://ledger.internal/api/v1`
    pub base_url: String,
    /// Bearer token
    pub api_key: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl LedgerGatewayConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_secs: 30,
        }
    }
}

/// HTTP client for the ledger gateway
pub struct HttpLedgerGateway {
    client: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct PrepareSubmissionRequest {
    correlation_id: String,
    claimant_id: String,
    policy_id: String,
    requested_amount: Decimal,
    currency: String,
    evidence_count: usize,
}

#[derive(Serialize)]
struct PrepareSettlementRequest {
    correlation_id: String,
    recipient: String,
    amount: Decimal,
    currency: String,
}

#[derive(Deserialize)]
struct PrepareResponse {
    reference: String,
}

impl HttpLedgerGateway {
    pub fn new(config: LedgerGatewayConfig) -> Result<Self, PortError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|_| PortError::validation("invalid characters in ledger API key"))?,
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

    /// Sends a prepare call and decodes the returned payload reference.
    /// Prepare calls mutate gateway state, so they are never retried here.
    async fn prepare(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<PreparedRef, PortError> {
        let resp = request
            .send()
            .await
            .map_err(|e| self.map_send_error(operation, e))?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(PortError::ServiceUnavailable {
                service: format!("ledger gateway: HTTP {status}"),
            });
        }
        if status.is_client_error() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PortError::validation(format!(
                "{operation}: HTTP {status}: {text}"
            )));
        }

        let parsed: PrepareResponse = resp
            .json()
            .await
            .map_err(|e| PortError::internal(format!("{operation}: malformed response: {e}")))?;
        Ok(PreparedRef::new(parsed.reference))
    }
}

impl DomainPort for HttpLedgerGateway {}

#[async_trait]
impl LedgerGateway for HttpLedgerGateway {
    async fn prepare_submission(
        &self,
        correlation_id: &CorrelationId,
        claim: &Claim,
    ) -> Result<PreparedRef, PortError> {
        let url = format!("{}/claims/prepare", self.base_url);
        let body = PrepareSubmissionRequest {
            correlation_id: correlation_id.to_string(),
            claimant_id: claim.claimant_id.to_string(),
            policy_id: claim.policy_id.to_string(),
            requested_amount: claim.requested_amount.amount(),
            currency: claim.requested_amount.currency().to_string(),
            evidence_count: claim.evidence_refs.len(),
        };
        self.prepare("prepare_submission", self.client.post(&url).json(&body))
            .await
    }

    async fn prepare_settlement(
        &self,
        correlation_id: &CorrelationId,
        amount: &Money,
        recipient: &PartyId,
    ) -> Result<PreparedRef, PortError> {
        let url = format!("{}/settlements/prepare", self.base_url);
        let body = PrepareSettlementRequest {
            correlation_id: correlation_id.to_string(),
            recipient: recipient.to_string(),
            amount: amount.amount(),
            currency: amount.currency().to_string(),
        };
        self.prepare("prepare_settlement", self.client.post(&url).json(&body))
            .await
    }

    async fn get_state(&self, reference: &PreparedRef) -> Result<LedgerState, PortError> {
        let url = format!("{}/transactions/{}", self.base_url, reference);

        // Idempotent read; retried with bounded backoff.
        let resp = retry_send("get_state", || self.client.get(&url).send())
            .await
            .map_err(|e| self.map_send_error("get_state", e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PortError::not_found("LedgerTransaction", reference));
        }
        if status.is_server_error() {
            return Err(PortError::ServiceUnavailable {
                service: format!("ledger gateway: HTTP {status}"),
            });
        }
        if status.is_client_error() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PortError::validation(format!(
                "get_state: HTTP {status}: {text}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| PortError::internal(format!("get_state: malformed response: {e}")))
    }
}
