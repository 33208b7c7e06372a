//! Escrow Record Types
//!
//! Type definitions for payments, status history and disputes.
//! These shapes are the contract of the [`crate::store::PaymentStore`]
//! collaborator: the store returns them fully typed, never raw rows.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::PaymentStatus;

/// Who triggered a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum TriggeredBy {
    System = 0,
    Freelancer = 1,
    Client = 2,
    Admin = 3,
}

impl TriggeredBy {
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(TriggeredBy::System),
            1 => Some(TriggeredBy::Freelancer),
            2 => Some(TriggeredBy::Client),
            3 => Some(TriggeredBy::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggeredBy::System => "system",
            TriggeredBy::Freelancer => "freelancer",
            TriggeredBy::Client => "client",
            TriggeredBy::Admin => "admin",
        }
    }
}

impl fmt::Display for TriggeredBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The escrow record
///
/// `status` only ever changes through
/// [`crate::ledger::EscrowLedger::apply_status`]; every other field the
/// ledger touches (`paid_at`, `delivered_at`, `completed_at`) is written in
/// the same transaction as the status it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Payment {
    pub id: String,
    /// Positive amount in major units; converted to provider minor units at
    /// the adapter boundary only
    pub amount: Decimal,
    /// ISO 4217 code, upper case
    pub currency: String,
    pub status: PaymentStatus,
    pub freelancer_id: String,
    pub client_email: String,
    pub project_name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set exactly once, when status first becomes `paid`
    pub paid_at: Option<DateTime<Utc>>,
    /// Set exactly once, when status first becomes `delivered`
    pub delivered_at: Option<DateTime<Utc>>,
    /// Set when a terminal status is reached
    pub completed_at: Option<DateTime<Utc>>,
    /// Reconciliation join key; overwritten when a provider order is retried,
    /// so at most one non-terminal provider order is live per payment
    pub provider_order_id: Option<String>,
}

/// Append-only status history entry
///
/// The payment's current status always equals the status of its most recent
/// history entry: both are written in one transaction.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StatusHistoryEntry {
    pub payment_id: String,
    pub status: PaymentStatus,
    pub timestamp: DateTime<Utc>,
    pub triggered_by: TriggeredBy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StatusHistoryEntry {
    pub fn new(
        payment_id: impl Into<String>,
        status: PaymentStatus,
        triggered_by: TriggeredBy,
        note: Option<String>,
    ) -> Self {
        Self {
            payment_id: payment_id.into(),
            status,
            timestamp: Utc::now(),
            triggered_by,
            note,
        }
    }
}

/// Dispute resolution outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum DisputeResolution {
    Refund = 1,
    Release = 2,
    PartialRefund = 3,
}

impl DisputeResolution {
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(DisputeResolution::Refund),
            2 => Some(DisputeResolution::Release),
            3 => Some(DisputeResolution::PartialRefund),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeResolution::Refund => "refund",
            DisputeResolution::Release => "release",
            DisputeResolution::PartialRefund => "partial_refund",
        }
    }

    /// The payment status a resolution lands the payment in
    pub fn final_status(&self) -> PaymentStatus {
        match self {
            DisputeResolution::Release => PaymentStatus::Released,
            DisputeResolution::Refund | DisputeResolution::PartialRefund => {
                PaymentStatus::Refunded
            }
        }
    }
}

impl fmt::Display for DisputeResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A dispute opened by the client against a paid or delivered payment
///
/// Resolving the dispute is the only way out of `contested`. The ledger
/// records `resolution_amount` for partial refunds; the monetary split itself
/// is executed by the settlement collaborator, not here.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Dispute {
    pub id: String,
    pub payment_id: String,
    pub reason: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution: Option<DisputeResolution>,
    pub resolution_amount: Option<Decimal>,
}

impl Dispute {
    pub fn new(
        payment_id: impl Into<String>,
        reason: impl Into<String>,
        description: impl Into<String>,
        evidence: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payment_id: payment_id.into(),
            reason: reason.into(),
            description: description.into(),
            evidence,
            created_at: Utc::now(),
            resolved_at: None,
            resolution: None,
            resolution_amount: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triggered_by_roundtrip() {
        for t in [
            TriggeredBy::System,
            TriggeredBy::Freelancer,
            TriggeredBy::Client,
            TriggeredBy::Admin,
        ] {
            assert_eq!(TriggeredBy::from_id(t.id()), Some(t));
        }
        assert!(TriggeredBy::from_id(42).is_none());
    }

    #[test]
    fn test_resolution_final_status() {
        assert_eq!(
            DisputeResolution::Release.final_status(),
            PaymentStatus::Released
        );
        assert_eq!(
            DisputeResolution::Refund.final_status(),
            PaymentStatus::Refunded
        );
        assert_eq!(
            DisputeResolution::PartialRefund.final_status(),
            PaymentStatus::Refunded
        );
    }

    #[test]
    fn test_new_dispute_is_unresolved() {
        let d = Dispute::new("pay_1", "quality", "wrong deliverable", vec![]);
        assert!(d.resolved_at.is_none());
        assert!(d.resolution.is_none());
        assert_eq!(d.payment_id, "pay_1");
    }
}
