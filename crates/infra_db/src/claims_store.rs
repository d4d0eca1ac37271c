//! PostgreSQL claims store
//!
//! Implements the claims store port against the `claims` table. Updates
//! are optimistic: the `WHERE version = $n` guard makes a stale write
//! affect zero rows, which surfaces as a conflict to the caller.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use core_kernel::{
    ClaimId, CorrelationId, Currency, DomainPort, Money, PartyId, PolicyId, PortError, ProposalId,
};
use domain_claims::{
    Claim, ClaimError, ClaimStatistics, ClaimStatus, ClaimStore, ClaimType, EvidenceRef,
    LedgerCorrelation, RiskAnalysis,
};

use crate::error::DatabaseError;

const CLAIM_COLUMNS: &str = "claim_id, correlation_id, claimant_id, policy_id, claim_type, \
     requested_amount, currency, approved_amount, description, evidence_refs, risk_analysis, \
     ledger, proposal_id, resolution_reason, status, version, created_at, updated_at";

/// Claims store backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PostgresClaimStore {
    pool: PgPool,
}

impl PostgresClaimStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_claim(row: &sqlx::postgres::PgRow) -> Result<Claim, DatabaseError> {
        let decode = |e: sqlx::Error| DatabaseError::SerializationError(e.to_string());
        let parse = |e: ClaimError| DatabaseError::SerializationError(e.to_string());

        let currency_code: String = row.try_get("currency").map_err(decode)?;
        let currency = Currency::from_str(&currency_code)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        let requested: Decimal = row.try_get("requested_amount").map_err(decode)?;
        let approved: Option<Decimal> = row.try_get("approved_amount").map_err(decode)?;

        let claim_type: String = row.try_get("claim_type").map_err(decode)?;
        let status: String = row.try_get("status").map_err(decode)?;

        let evidence_refs: serde_json::Value = row.try_get("evidence_refs").map_err(decode)?;
        let evidence_refs: Vec<EvidenceRef> = serde_json::from_value(evidence_refs)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        let risk_analysis: Option<serde_json::Value> =
            row.try_get("risk_analysis").map_err(decode)?;
        let risk_analysis: Option<RiskAnalysis> = risk_analysis
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        let ledger: serde_json::Value = row.try_get("ledger").map_err(decode)?;
        let ledger: LedgerCorrelation = serde_json::from_value(ledger)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        let version: i64 = row.try_get("version").map_err(decode)?;

        Ok(Claim {
            id: ClaimId::from_uuid(row.try_get::<Uuid, _>("claim_id").map_err(decode)?),
            correlation_id: CorrelationId::from_uuid(
                row.try_get::<Uuid, _>("correlation_id").map_err(decode)?,
            ),
            claimant_id: PartyId::from_uuid(row.try_get::<Uuid, _>("claimant_id").map_err(decode)?),
            policy_id: PolicyId::from_uuid(row.try_get::<Uuid, _>("policy_id").map_err(decode)?),
            claim_type: ClaimType::from_str(&claim_type).map_err(parse)?,
            requested_amount: Money::new(requested, currency),
            approved_amount: approved.map(|a| Money::new(a, currency)),
            description: row.try_get("description").map_err(decode)?,
            evidence_refs,
            risk_analysis,
            ledger,
            proposal_id: row
                .try_get::<Option<Uuid>, _>("proposal_id")
                .map_err(decode)?
                .map(ProposalId::from_uuid),
            resolution_reason: row.try_get("resolution_reason").map_err(decode)?,
            status: ClaimStatus::from_str(&status).map_err(parse)?,
            version: version as u64,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(decode)?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(decode)?,
        })
    }

    fn encode_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, ClaimError> {
        serde_json::to_value(value)
            .map_err(|e| ClaimError::Store(PortError::internal(e.to_string())))
    }
}

impl DomainPort for PostgresClaimStore {}

#[async_trait]
impl ClaimStore for PostgresClaimStore {
    async fn insert(
        &self,
        claim: Claim,
        idempotency_key: Option<&str>,
    ) -> Result<Claim, ClaimError> {
        let query = format!(
            "INSERT INTO claims ( \
                 claim_id, correlation_id, claimant_id, policy_id, claim_type, \
                 requested_amount, currency, approved_amount, description, evidence_refs, \
                 risk_analysis, ledger, proposal_id, resolution_reason, status, version, \
                 idempotency_key, created_at, updated_at \
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                 $17, $18, $19) \
             RETURNING {CLAIM_COLUMNS}"
        );

        let row = sqlx::query(&query)
            .bind(claim.id.as_uuid())
            .bind(claim.correlation_id.as_uuid())
            .bind(claim.claimant_id.as_uuid())
            .bind(claim.policy_id.as_uuid())
            .bind(claim.claim_type.to_string())
            .bind(claim.requested_amount.amount())
            .bind(claim.requested_amount.currency().code())
            .bind(claim.approved_amount.map(|a| a.amount()))
            .bind(&claim.description)
            .bind(Self::encode_json(&claim.evidence_refs)?)
            .bind(claim.risk_analysis.as_ref().map(Self::encode_json).transpose()?)
            .bind(Self::encode_json(&claim.ledger)?)
            .bind(claim.proposal_id.map(|p| *p.as_uuid()))
            .bind(&claim.resolution_reason)
            .bind(claim.status.to_string())
            .bind(claim.version as i64)
            .bind(idempotency_key)
            .bind(claim.created_at)
            .bind(claim.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        Ok(Self::row_to_claim(&row)?)
    }

    async fn get(&self, id: ClaimId) -> Result<Claim, ClaimError> {
        let query = format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE claim_id = $1");
        let row = sqlx::query(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| ClaimError::NotFound(id.to_string()))?;
        Ok(Self::row_to_claim(&row)?)
    }

    async fn get_by_correlation(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<Claim, ClaimError> {
        let query = format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE correlation_id = $1");
        let row = sqlx::query(&query)
            .bind(correlation_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| ClaimError::NotFound(correlation_id.to_string()))?;
        Ok(Self::row_to_claim(&row)?)
    }

    async fn update(&self, claim: &Claim) -> Result<Claim, ClaimError> {
        let query = format!(
            "UPDATE claims SET \
                 claim_type = $3, requested_amount = $4, currency = $5, approved_amount = $6, \
                 description = $7, evidence_refs = $8, risk_analysis = $9, ledger = $10, \
                 proposal_id = $11, resolution_reason = $12, status = $13, \
                 version = version + 1, updated_at = NOW() \
             WHERE claim_id = $1 AND version = $2 \
             RETURNING {CLAIM_COLUMNS}"
        );

        let row = sqlx::query(&query)
            .bind(claim.id.as_uuid())
            .bind(claim.version as i64)
            .bind(claim.claim_type.to_string())
            .bind(claim.requested_amount.amount())
            .bind(claim.requested_amount.currency().code())
            .bind(claim.approved_amount.map(|a| a.amount()))
            .bind(&claim.description)
            .bind(Self::encode_json(&claim.evidence_refs)?)
            .bind(claim.risk_analysis.as_ref().map(Self::encode_json).transpose()?)
            .bind(Self::encode_json(&claim.ledger)?)
            .bind(claim.proposal_id.map(|p| *p.as_uuid()))
            .bind(&claim.resolution_reason)
            .bind(claim.status.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        match row {
            Some(row) => Ok(Self::row_to_claim(&row)?),
            // Zero rows: either the claim is gone or the version is stale.
            None => {
                let exists = sqlx::query("SELECT 1 FROM claims WHERE claim_id = $1")
                    .bind(claim.id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(DatabaseError::from)?;
                if exists.is_some() {
                    Err(ClaimError::Conflict(claim.id.to_string()))
                } else {
                    Err(ClaimError::NotFound(claim.id.to_string()))
                }
            }
        }
    }

    async fn list_open_with_proposal(&self) -> Result<Vec<Claim>, ClaimError> {
        let query = format!(
            "SELECT {CLAIM_COLUMNS} FROM claims \
             WHERE proposal_id IS NOT NULL \
               AND status NOT IN ('paid', 'rejected', 'disputed') \
             ORDER BY created_at"
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        rows.iter()
            .map(|row| Self::row_to_claim(row).map_err(ClaimError::from))
            .collect()
    }

    async fn statistics(&self) -> Result<ClaimStatistics, ClaimError> {
        let row = sqlx::query(
            "SELECT \
                 COUNT(*) AS total, \
                 COUNT(*) FILTER (WHERE status IN \
                     ('submitted', 'ai_validated', 'ai_rejected', 'under_review')) AS pending, \
                 COUNT(*) FILTER (WHERE status = 'approved') AS approved, \
                 COUNT(*) FILTER (WHERE status = 'paid') AS paid, \
                 COUNT(*) FILTER (WHERE status = 'rejected') AS rejected, \
                 COALESCE(SUM(approved_amount) FILTER (WHERE status = 'paid'), 0) AS total_paid \
             FROM claims",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        let decode =
            |e: sqlx::Error| ClaimError::Store(PortError::internal(e.to_string()));

        let total: i64 = row.try_get("total").map_err(decode)?;
        let pending: i64 = row.try_get("pending").map_err(decode)?;
        let approved: i64 = row.try_get("approved").map_err(decode)?;
        let paid: i64 = row.try_get("paid").map_err(decode)?;
        let rejected: i64 = row.try_get("rejected").map_err(decode)?;
        let total_paid: Decimal = row.try_get("total_paid").map_err(decode)?;

        let approval_rate = if total > 0 {
            (Decimal::from(approved + paid) / Decimal::from(total)).round_dp(4)
        } else {
            Decimal::ZERO
        };

        Ok(ClaimStatistics {
            total_claims: total as u64,
            pending_claims: pending as u64,
            approved_claims: approved as u64,
            paid_claims: paid as u64,
            rejected_claims: rejected as u64,
            total_paid_amount: total_paid,
            approval_rate,
        })
    }
}
