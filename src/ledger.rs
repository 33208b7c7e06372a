//! Escrow Ledger
//!
//! Single authoritative entry point for all payment status changes. Every
//! mutation is a CAS on the status column, which serializes concurrent
//! writers per payment id; [`EscrowLedger::apply_status`] is the generic
//! form, and the release and dispute paths pin their own expected status.
//!
//! # Safety Invariants
//!
//! 1. **One mutation path**: nothing else writes `Payment.status`
//! 2. **Atomic pair**: history append and status update commit together
//! 3. **Idempotent replay**: applying the current status again is a no-op
//!    success, never an error (provider webhooks are redelivered)
//! 4. **Best-effort side effects**: notification failure never rolls back
//!    a committed transition

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::EscrowError;
use crate::models::{Dispute, DisputeResolution, Payment, StatusHistoryEntry, TriggeredBy};
use crate::notify::{Notifier, NotifyEvent};
use crate::status::PaymentStatus;
use crate::store::{PaymentStore, StatusWrite};

/// Outcome of a status application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The transition was written (exactly one new history entry)
    Transitioned,
    /// Current status already equals the target; nothing written
    NoOp,
}

pub struct EscrowLedger {
    store: Arc<dyn PaymentStore>,
    notifier: Arc<dyn Notifier>,
}

impl EscrowLedger {
    pub fn new(store: Arc<dyn PaymentStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Access to the store for the scheduler and read-side handlers
    pub fn store(&self) -> &Arc<dyn PaymentStore> {
        &self.store
    }

    /// Core primitive: validate, append history, persist - atomically.
    ///
    /// Replay-safe: if the payment is already at `new_status` the call
    /// succeeds as a no-op without a new history entry. Two racing writers
    /// cannot both win; the loser either observes the same target (no-op)
    /// or gets `PersistenceConflict`.
    pub async fn apply_status(
        &self,
        payment_id: &str,
        new_status: PaymentStatus,
        triggered_by: TriggeredBy,
        note: Option<String>,
    ) -> Result<Applied, EscrowError> {
        let payment = self
            .store
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| EscrowError::NotFound(payment_id.to_string()))?;

        if payment.status == new_status {
            debug!(
                payment_id = %payment_id,
                status = %new_status,
                "Status already applied - idempotent no-op"
            );
            return Ok(Applied::NoOp);
        }

        if !payment.status.can_transition(new_status) {
            return Err(EscrowError::InvalidTransition {
                from: payment.status,
                to: new_status,
            });
        }

        let write = StatusWrite::for_entry(StatusHistoryEntry::new(
            payment_id,
            new_status,
            triggered_by,
            note,
        ));

        if !self
            .store
            .update_status_if(payment_id, payment.status, &write)
            .await?
        {
            // Another writer got there first. If it applied the same target
            // this is the replay case; anything else is a real conflict.
            let current = self
                .store
                .get_payment(payment_id)
                .await?
                .ok_or_else(|| EscrowError::NotFound(payment_id.to_string()))?;
            if current.status == new_status {
                debug!(
                    payment_id = %payment_id,
                    status = %new_status,
                    "Lost CAS to an identical transition - no-op"
                );
                return Ok(Applied::NoOp);
            }
            return Err(EscrowError::PersistenceConflict(payment_id.to_string()));
        }

        info!(
            payment_id = %payment_id,
            from = %payment.status,
            to = %new_status,
            triggered_by = %triggered_by,
            "Status transition applied"
        );

        self.fire_side_effects(&payment, new_status).await;
        Ok(Applied::Transitioned)
    }

    /// Freelancer marks the project delivered. Requires current status
    /// `paid` and ownership of the payment; sets `delivered_at` and notifies
    /// the client that the validation window has started.
    pub async fn mark_as_delivered(
        &self,
        payment_id: &str,
        freelancer_id: &str,
        note: Option<String>,
    ) -> Result<Applied, EscrowError> {
        let payment = self
            .store
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| EscrowError::NotFound(payment_id.to_string()))?;

        // Ownership before transition: a non-owner must not learn anything
        // about the status graph from the error.
        if payment.freelancer_id != freelancer_id {
            return Err(EscrowError::Forbidden(format!(
                "payment {} is not owned by {}",
                payment_id, freelancer_id
            )));
        }

        self.apply_status(
            payment_id,
            PaymentStatus::Delivered,
            TriggeredBy::Freelancer,
            Some(note.unwrap_or_else(|| "Project delivered by the freelancer".to_string())),
        )
        .await
    }

    /// Release held funds to the freelancer: the client validation path and
    /// the auto-release sweep both land here.
    ///
    /// Requires current status `delivered`. The `contested -> released` edge
    /// belongs to [`Self::resolve_dispute`] alone; this path must never
    /// release over an open dispute, so the CAS pins `delivered` as the
    /// expected status and a dispute filed after our read wins the race.
    pub async fn validate_and_release(
        &self,
        payment_id: &str,
        triggered_by: TriggeredBy,
        note: Option<String>,
    ) -> Result<Applied, EscrowError> {
        let payment = self
            .store
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| EscrowError::NotFound(payment_id.to_string()))?;

        if payment.status == PaymentStatus::Released {
            debug!(payment_id = %payment_id, "Already released - idempotent no-op");
            return Ok(Applied::NoOp);
        }
        if payment.status != PaymentStatus::Delivered {
            return Err(EscrowError::InvalidTransition {
                from: payment.status,
                to: PaymentStatus::Released,
            });
        }

        let write = StatusWrite::for_entry(StatusHistoryEntry::new(
            payment_id,
            PaymentStatus::Released,
            triggered_by,
            Some(note.unwrap_or_else(|| "Funds released".to_string())),
        ));

        if !self
            .store
            .update_status_if(payment_id, PaymentStatus::Delivered, &write)
            .await?
        {
            let current = self
                .store
                .get_payment(payment_id)
                .await?
                .ok_or_else(|| EscrowError::NotFound(payment_id.to_string()))?;
            return match current.status {
                PaymentStatus::Released => Ok(Applied::NoOp),
                status => Err(EscrowError::InvalidTransition {
                    from: status,
                    to: PaymentStatus::Released,
                }),
            };
        }

        info!(
            payment_id = %payment_id,
            from = %PaymentStatus::Delivered,
            to = %PaymentStatus::Released,
            triggered_by = %triggered_by,
            "Funds released"
        );

        self.fire_side_effects(&payment, PaymentStatus::Released).await;
        Ok(Applied::Transitioned)
    }

    /// Open a dispute. Requires the payment to be `paid` or `delivered`
    /// (anything else fails the `-> contested` edge check). The dispute row
    /// rides in the same store transaction as the contested write, so the
    /// payment can never end up contested without a dispute to resolve.
    pub async fn create_dispute(
        &self,
        payment_id: &str,
        reason: &str,
        description: &str,
        evidence: Vec<String>,
    ) -> Result<Dispute, EscrowError> {
        let payment = self
            .store
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| EscrowError::NotFound(payment_id.to_string()))?;

        // Already contested: a second dispute on the same payment is a
        // conflict, not a silent duplicate.
        if payment.status == PaymentStatus::Contested
            || !payment.status.can_transition(PaymentStatus::Contested)
        {
            return Err(EscrowError::InvalidTransition {
                from: payment.status,
                to: PaymentStatus::Contested,
            });
        }

        let dispute = Dispute::new(payment_id, reason, description, evidence);
        let write = StatusWrite::for_entry(StatusHistoryEntry::new(
            payment_id,
            PaymentStatus::Contested,
            TriggeredBy::Client,
            Some(format!("Dispute opened: {}", reason)),
        ))
        .with_dispute(dispute.clone());

        if !self
            .store
            .update_status_if(payment_id, payment.status, &write)
            .await?
        {
            let current = self
                .store
                .get_payment(payment_id)
                .await?
                .ok_or_else(|| EscrowError::NotFound(payment_id.to_string()))?;
            if current.status == PaymentStatus::Contested {
                // Another dispute writer won; ours was never inserted.
                return Err(EscrowError::InvalidTransition {
                    from: PaymentStatus::Contested,
                    to: PaymentStatus::Contested,
                });
            }
            return Err(EscrowError::PersistenceConflict(payment_id.to_string()));
        }

        info!(
            payment_id = %payment_id,
            dispute_id = %dispute.id,
            reason = %reason,
            "Dispute created"
        );
        self.fire_side_effects(&payment, PaymentStatus::Contested).await;
        Ok(dispute)
    }

    /// Resolve a dispute: the only way out of `contested`. `release` moves
    /// the payment to `released`; `refund` and `partial_refund` to
    /// `refunded`. The ledger records the resolution amount for the
    /// settlement collaborator; it does not execute the monetary split.
    pub async fn resolve_dispute(
        &self,
        dispute_id: &str,
        resolution: DisputeResolution,
        amount: Option<Decimal>,
    ) -> Result<Dispute, EscrowError> {
        let dispute = self
            .store
            .get_dispute(dispute_id)
            .await?
            .ok_or_else(|| EscrowError::DisputeNotFound(dispute_id.to_string()))?;

        let payment = self
            .store
            .get_payment(&dispute.payment_id)
            .await?
            .ok_or_else(|| EscrowError::NotFound(dispute.payment_id.clone()))?;

        if dispute.resolved_at.is_some() {
            return Err(EscrowError::DisputeAlreadyResolved(dispute_id.to_string()));
        }

        if resolution == DisputeResolution::PartialRefund {
            let amount = amount.ok_or(EscrowError::InvalidAmount)?;
            if amount <= Decimal::ZERO || amount >= payment.amount {
                return Err(EscrowError::InvalidAmount);
            }
        }

        // Payment transition first: if the resolution write below fails the
        // payment is still consistent and the whole call can be retried
        // (the replay is a no-op). The reverse order would strand a resolved
        // dispute on a contested payment.
        self.apply_status(
            &dispute.payment_id,
            resolution.final_status(),
            TriggeredBy::Admin,
            Some(format!("Dispute {} resolved: {}", dispute_id, resolution)),
        )
        .await?;

        // CAS on resolved_at serializes concurrent resolvers.
        let resolved_at = chrono::Utc::now();
        if !self
            .store
            .mark_dispute_resolved(dispute_id, resolution, amount, resolved_at)
            .await?
        {
            return Err(EscrowError::DisputeAlreadyResolved(dispute_id.to_string()));
        }

        let mut resolved = dispute;
        resolved.resolution = Some(resolution);
        resolved.resolution_amount = amount;
        resolved.resolved_at = Some(resolved_at);
        Ok(resolved)
    }

    /// Notify interested parties after a committed transition. Failures are
    /// logged and swallowed.
    async fn fire_side_effects(&self, payment: &Payment, new_status: PaymentStatus) {
        let event = match new_status {
            PaymentStatus::Delivered => NotifyEvent::Delivered,
            PaymentStatus::Released => NotifyEvent::Released,
            PaymentStatus::Contested => NotifyEvent::Disputed,
            _ => return,
        };

        if let Err(e) = self
            .notifier
            .notify(
                &payment.id,
                event,
                &payment.client_email,
                &payment.project_name,
            )
            .await
        {
            warn!(
                payment_id = %payment.id,
                event = event.as_str(),
                error = %e,
                "Notification failed (transition stands)"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogNotifier;
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};

    fn pending_payment(id: &str) -> Payment {
        let now = Utc::now();
        Payment {
            id: id.to_string(),
            amount: Decimal::new(25000, 2),
            currency: "EUR".to_string(),
            status: PaymentStatus::Pending,
            freelancer_id: "fr_1".to_string(),
            client_email: "client@example.com".to_string(),
            project_name: "site rebuild".to_string(),
            created_at: now,
            expires_at: now + Duration::days(30),
            paid_at: None,
            delivered_at: None,
            completed_at: None,
            provider_order_id: None,
        }
    }

    async fn ledger_with(payments: &[Payment]) -> EscrowLedger {
        let store = Arc::new(MemoryStore::new());
        for p in payments {
            store.create_payment(p).await.unwrap();
        }
        EscrowLedger::new(store, Arc::new(LogNotifier))
    }

    #[tokio::test]
    async fn test_valid_transition_appends_one_history_entry() {
        let ledger = ledger_with(&[pending_payment("p1")]).await;

        let applied = ledger
            .apply_status("p1", PaymentStatus::Paid, TriggeredBy::System, None)
            .await
            .unwrap();
        assert_eq!(applied, Applied::Transitioned);

        let p = ledger.store().get_payment("p1").await.unwrap().unwrap();
        assert_eq!(p.status, PaymentStatus::Paid);
        assert!(p.paid_at.is_some());

        let history = ledger.store().history("p1").await.unwrap();
        // creation entry + paid entry
        assert_eq!(history.len(), 2);
        assert_eq!(history.last().unwrap().status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_invalid_transition_rejected_without_mutation() {
        let ledger = ledger_with(&[pending_payment("p1")]).await;

        let err = ledger
            .apply_status("p1", PaymentStatus::Released, TriggeredBy::Client, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidTransition { .. }));

        let p = ledger.store().get_payment("p1").await.unwrap().unwrap();
        assert_eq!(p.status, PaymentStatus::Pending);
        assert_eq!(ledger.store().history("p1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replay_is_noop() {
        let ledger = ledger_with(&[pending_payment("p1")]).await;

        ledger
            .apply_status("p1", PaymentStatus::Paid, TriggeredBy::System, None)
            .await
            .unwrap();
        let second = ledger
            .apply_status("p1", PaymentStatus::Paid, TriggeredBy::System, None)
            .await
            .unwrap();
        assert_eq!(second, Applied::NoOp);

        // Exactly one paid entry despite two calls
        let paid_entries = ledger
            .store()
            .history("p1")
            .await
            .unwrap()
            .into_iter()
            .filter(|h| h.status == PaymentStatus::Paid)
            .count();
        assert_eq!(paid_entries, 1);
    }

    #[tokio::test]
    async fn test_unknown_payment_is_not_found() {
        let ledger = ledger_with(&[]).await;
        let err = ledger
            .apply_status("ghost", PaymentStatus::Paid, TriggeredBy::System, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_deliver_requires_ownership() {
        let ledger = ledger_with(&[pending_payment("p1")]).await;
        ledger
            .apply_status("p1", PaymentStatus::Paid, TriggeredBy::System, None)
            .await
            .unwrap();

        let err = ledger
            .mark_as_delivered("p1", "someone_else", None)
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowError::Forbidden(_)));

        let applied = ledger.mark_as_delivered("p1", "fr_1", None).await.unwrap();
        assert_eq!(applied, Applied::Transitioned);
        let p = ledger.store().get_payment("p1").await.unwrap().unwrap();
        assert!(p.delivered_at.is_some());
    }

    #[tokio::test]
    async fn test_deliver_requires_paid() {
        let ledger = ledger_with(&[pending_payment("p1")]).await;
        let err = ledger
            .mark_as_delivered("p1", "fr_1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_release_requires_delivered() {
        let ledger = ledger_with(&[pending_payment("p1")]).await;
        ledger
            .apply_status("p1", PaymentStatus::Paid, TriggeredBy::System, None)
            .await
            .unwrap();

        // Paid but not yet delivered: nothing to validate
        let err = ledger
            .validate_and_release("p1", TriggeredBy::Client, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EscrowError::InvalidTransition {
                from: PaymentStatus::Paid,
                to: PaymentStatus::Released,
            }
        ));

        ledger.mark_as_delivered("p1", "fr_1", None).await.unwrap();
        let applied = ledger
            .validate_and_release("p1", TriggeredBy::Client, None)
            .await
            .unwrap();
        assert_eq!(applied, Applied::Transitioned);

        // Replaying the release is an idempotent no-op
        let again = ledger
            .validate_and_release("p1", TriggeredBy::Client, None)
            .await
            .unwrap();
        assert_eq!(again, Applied::NoOp);
    }

    #[tokio::test]
    async fn test_contested_payment_cannot_be_released() {
        let ledger = ledger_with(&[pending_payment("p1")]).await;
        ledger
            .apply_status("p1", PaymentStatus::Paid, TriggeredBy::System, None)
            .await
            .unwrap();
        ledger.mark_as_delivered("p1", "fr_1", None).await.unwrap();
        ledger
            .create_dispute("p1", "quality", "broken layout", vec![])
            .await
            .unwrap();

        // An open dispute blocks both client validation and the sweep;
        // only resolve_dispute may leave contested.
        let err = ledger
            .validate_and_release("p1", TriggeredBy::Client, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EscrowError::InvalidTransition {
                from: PaymentStatus::Contested,
                to: PaymentStatus::Released,
            }
        ));

        let p = ledger.store().get_payment("p1").await.unwrap().unwrap();
        assert_eq!(p.status, PaymentStatus::Contested);
    }

    #[tokio::test]
    async fn test_dispute_from_paid_then_resolution_release() {
        let ledger = ledger_with(&[pending_payment("p1")]).await;
        ledger
            .apply_status("p1", PaymentStatus::Paid, TriggeredBy::System, None)
            .await
            .unwrap();

        let dispute = ledger
            .create_dispute("p1", "scope", "missing pages", vec![])
            .await
            .unwrap();
        let p = ledger.store().get_payment("p1").await.unwrap().unwrap();
        assert_eq!(p.status, PaymentStatus::Contested);

        let resolved = ledger
            .resolve_dispute(&dispute.id, DisputeResolution::Release, None)
            .await
            .unwrap();
        assert!(resolved.resolved_at.is_some());

        let p = ledger.store().get_payment("p1").await.unwrap().unwrap();
        assert_eq!(p.status, PaymentStatus::Released);
        assert!(p.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_second_dispute_rejected() {
        let ledger = ledger_with(&[pending_payment("p1")]).await;
        ledger
            .apply_status("p1", PaymentStatus::Paid, TriggeredBy::System, None)
            .await
            .unwrap();
        ledger
            .create_dispute("p1", "scope", "missing pages", vec![])
            .await
            .unwrap();

        let err = ledger
            .create_dispute("p1", "scope", "same again", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_partial_refund_requires_amount_below_total() {
        let ledger = ledger_with(&[pending_payment("p1")]).await;
        ledger
            .apply_status("p1", PaymentStatus::Paid, TriggeredBy::System, None)
            .await
            .unwrap();
        let dispute = ledger
            .create_dispute("p1", "quality", "late delivery", vec![])
            .await
            .unwrap();

        // Full amount is 250.00; partial refund must be strictly below
        let err = ledger
            .resolve_dispute(
                &dispute.id,
                DisputeResolution::PartialRefund,
                Some(Decimal::new(25000, 2)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidAmount));

        let resolved = ledger
            .resolve_dispute(
                &dispute.id,
                DisputeResolution::PartialRefund,
                Some(Decimal::new(10000, 2)),
            )
            .await
            .unwrap();
        assert_eq!(resolved.resolution_amount, Some(Decimal::new(10000, 2)));

        let p = ledger.store().get_payment("p1").await.unwrap().unwrap();
        assert_eq!(p.status, PaymentStatus::Refunded);
    }

    /// Store double that fails `mark_dispute_resolved` while armed, for
    /// exercising partial-failure recovery in the resolve path.
    struct FlakyResolutionStore {
        inner: MemoryStore,
        fail_resolution: std::sync::atomic::AtomicBool,
    }

    impl FlakyResolutionStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                fail_resolution: std::sync::atomic::AtomicBool::new(false),
            }
        }

        fn arm(&self, fail: bool) {
            self.fail_resolution
                .store(fail, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl PaymentStore for FlakyResolutionStore {
        async fn create_payment(&self, payment: &Payment) -> Result<(), EscrowError> {
            self.inner.create_payment(payment).await
        }

        async fn get_payment(&self, id: &str) -> Result<Option<Payment>, EscrowError> {
            self.inner.get_payment(id).await
        }

        async fn get_payment_by_provider_order(
            &self,
            provider_order_id: &str,
        ) -> Result<Option<Payment>, EscrowError> {
            self.inner.get_payment_by_provider_order(provider_order_id).await
        }

        async fn update_status_if(
            &self,
            payment_id: &str,
            expected: PaymentStatus,
            write: &StatusWrite,
        ) -> Result<bool, EscrowError> {
            self.inner.update_status_if(payment_id, expected, write).await
        }

        async fn set_provider_order(
            &self,
            payment_id: &str,
            provider_order_id: &str,
        ) -> Result<(), EscrowError> {
            self.inner.set_provider_order(payment_id, provider_order_id).await
        }

        async fn history(
            &self,
            payment_id: &str,
        ) -> Result<Vec<StatusHistoryEntry>, EscrowError> {
            self.inner.history(payment_id).await
        }

        async fn get_dispute(&self, id: &str) -> Result<Option<Dispute>, EscrowError> {
            self.inner.get_dispute(id).await
        }

        async fn mark_dispute_resolved(
            &self,
            id: &str,
            resolution: DisputeResolution,
            amount: Option<Decimal>,
            resolved_at: chrono::DateTime<Utc>,
        ) -> Result<bool, EscrowError> {
            if self
                .fail_resolution
                .load(std::sync::atomic::Ordering::SeqCst)
            {
                return Err(EscrowError::Database("connection reset".to_string()));
            }
            self.inner
                .mark_dispute_resolved(id, resolution, amount, resolved_at)
                .await
        }

        async fn release_candidates(
            &self,
            cutoff: chrono::DateTime<Utc>,
            limit: i64,
        ) -> Result<Vec<Payment>, EscrowError> {
            self.inner.release_candidates(cutoff, limit).await
        }
    }

    #[tokio::test]
    async fn test_resolve_retryable_after_failed_resolution_write() {
        let store = Arc::new(FlakyResolutionStore::new());
        store.create_payment(&pending_payment("p1")).await.unwrap();
        let ledger = EscrowLedger::new(store.clone(), Arc::new(LogNotifier));

        ledger
            .apply_status("p1", PaymentStatus::Paid, TriggeredBy::System, None)
            .await
            .unwrap();
        let dispute = ledger
            .create_dispute("p1", "quality", "details", vec![])
            .await
            .unwrap();

        store.arm(true);
        let err = ledger
            .resolve_dispute(&dispute.id, DisputeResolution::Refund, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowError::Database(_)));

        // The payment moved but the dispute is still open, so the same call
        // goes through cleanly once the store recovers.
        let d = store.get_dispute(&dispute.id).await.unwrap().unwrap();
        assert!(d.resolved_at.is_none());

        store.arm(false);
        let resolved = ledger
            .resolve_dispute(&dispute.id, DisputeResolution::Refund, None)
            .await
            .unwrap();
        assert!(resolved.resolved_at.is_some());

        let p = store.get_payment("p1").await.unwrap().unwrap();
        assert_eq!(p.status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn test_resolve_twice_rejected() {
        let ledger = ledger_with(&[pending_payment("p1")]).await;
        ledger
            .apply_status("p1", PaymentStatus::Paid, TriggeredBy::System, None)
            .await
            .unwrap();
        let dispute = ledger
            .create_dispute("p1", "quality", "details", vec![])
            .await
            .unwrap();

        ledger
            .resolve_dispute(&dispute.id, DisputeResolution::Refund, None)
            .await
            .unwrap();
        let err = ledger
            .resolve_dispute(&dispute.id, DisputeResolution::Release, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowError::DisputeAlreadyResolved(_)));
    }
}
