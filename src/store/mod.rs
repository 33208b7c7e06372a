//! Payment Store
//!
//! Persistence collaborator for the escrow ledger. All state updates use
//! atomic CAS (Compare-And-Swap) on the status column, and the history
//! append rides in the same transaction as the status write.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::EscrowError;
use crate::models::{Dispute, DisputeResolution, Payment, StatusHistoryEntry};
use crate::status::PaymentStatus;

pub use memory::MemoryStore;
pub use pg::PgPaymentStore;

/// One atomic status write: the new status (carried by the history entry)
/// plus the lifecycle timestamps that accompany it.
#[derive(Debug, Clone)]
pub struct StatusWrite {
    pub entry: StatusHistoryEntry,
    /// Set when entering `paid`; the store must not overwrite an existing value
    pub paid_at: Option<DateTime<Utc>>,
    /// Set when entering `delivered`; the store must not overwrite an existing value
    pub delivered_at: Option<DateTime<Utc>>,
    /// Set when entering a terminal status
    pub completed_at: Option<DateTime<Utc>>,
    /// Dispute row to insert in the same transaction as a `-> contested`
    /// write, so a payment can never be contested without a dispute to
    /// resolve (and a losing CAS writer inserts nothing)
    pub dispute: Option<Dispute>,
}

impl StatusWrite {
    /// Build the write for a transition into `entry.status`, deriving the
    /// timestamp columns from the target status.
    pub fn for_entry(entry: StatusHistoryEntry) -> Self {
        let now = entry.timestamp;
        let status = entry.status;
        Self {
            entry,
            paid_at: (status == PaymentStatus::Paid).then_some(now),
            delivered_at: (status == PaymentStatus::Delivered).then_some(now),
            completed_at: status.is_terminal().then_some(now),
            dispute: None,
        }
    }

    /// Attach the dispute row that accompanies a `-> contested` write
    pub fn with_dispute(mut self, dispute: Dispute) -> Self {
        self.dispute = Some(dispute);
        self
    }
}

/// Strongly-typed persistence contract
///
/// Implementations must guarantee:
/// - `update_status_if` performs {conditional status update, timestamp
///   updates, history append} atomically and returns `false` (with no
///   mutation at all) when the current status does not equal `expected`;
/// - lookups return the typed shapes of [`crate::models`], never partial rows.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn create_payment(&self, payment: &Payment) -> Result<(), EscrowError>;

    async fn get_payment(&self, id: &str) -> Result<Option<Payment>, EscrowError>;

    /// Fallback reconciliation lookup when the ext-ref join fails
    async fn get_payment_by_provider_order(
        &self,
        provider_order_id: &str,
    ) -> Result<Option<Payment>, EscrowError>;

    /// Atomic CAS status write. Returns `true` when this writer won.
    async fn update_status_if(
        &self,
        payment_id: &str,
        expected: PaymentStatus,
        write: &StatusWrite,
    ) -> Result<bool, EscrowError>;

    /// Record (or replace, on retry) the provider order join key
    async fn set_provider_order(
        &self,
        payment_id: &str,
        provider_order_id: &str,
    ) -> Result<(), EscrowError>;

    /// Full append-only history for a payment, oldest first
    async fn history(&self, payment_id: &str) -> Result<Vec<StatusHistoryEntry>, EscrowError>;

    async fn get_dispute(&self, id: &str) -> Result<Option<Dispute>, EscrowError>;

    /// Record a dispute resolution. Returns `false` if already resolved.
    async fn mark_dispute_resolved(
        &self,
        id: &str,
        resolution: DisputeResolution,
        amount: Option<Decimal>,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, EscrowError>;

    /// Payments currently `delivered` with `delivered_at <= cutoff`
    ///
    /// The sweep re-checks status through the ledger CAS anyway; this query
    /// is only the candidate set, re-evaluated fresh on every call.
    async fn release_candidates(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Payment>, EscrowError>;
}
