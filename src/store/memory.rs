//! In-Memory Payment Store
//!
//! Backs tests and demo runs without PostgreSQL. A single mutex over the
//! whole state gives the same atomicity the Pg store gets from transactions.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use super::{PaymentStore, StatusWrite};
use crate::error::EscrowError;
use crate::models::{Dispute, DisputeResolution, Payment, StatusHistoryEntry};
use crate::status::PaymentStatus;

#[derive(Default)]
struct Inner {
    payments: HashMap<String, Payment>,
    history: HashMap<String, Vec<StatusHistoryEntry>>,
    disputes: HashMap<String, Dispute>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn create_payment(&self, payment: &Payment) -> Result<(), EscrowError> {
        let mut inner = self.inner.lock().await;
        if inner.payments.contains_key(&payment.id) {
            return Err(EscrowError::Database(format!(
                "duplicate payment id {}",
                payment.id
            )));
        }
        inner
            .history
            .entry(payment.id.clone())
            .or_default()
            .push(StatusHistoryEntry {
                payment_id: payment.id.clone(),
                status: payment.status,
                timestamp: payment.created_at,
                triggered_by: crate::models::TriggeredBy::System,
                note: Some("Payment link created".to_string()),
            });
        inner.payments.insert(payment.id.clone(), payment.clone());
        Ok(())
    }

    async fn get_payment(&self, id: &str) -> Result<Option<Payment>, EscrowError> {
        Ok(self.inner.lock().await.payments.get(id).cloned())
    }

    async fn get_payment_by_provider_order(
        &self,
        provider_order_id: &str,
    ) -> Result<Option<Payment>, EscrowError> {
        Ok(self
            .inner
            .lock()
            .await
            .payments
            .values()
            .find(|p| p.provider_order_id.as_deref() == Some(provider_order_id))
            .cloned())
    }

    async fn update_status_if(
        &self,
        payment_id: &str,
        expected: PaymentStatus,
        write: &StatusWrite,
    ) -> Result<bool, EscrowError> {
        let mut inner = self.inner.lock().await;
        let Some(payment) = inner.payments.get_mut(payment_id) else {
            return Ok(false);
        };
        if payment.status != expected {
            return Ok(false);
        }

        payment.status = write.entry.status;
        payment.paid_at = payment.paid_at.or(write.paid_at);
        payment.delivered_at = payment.delivered_at.or(write.delivered_at);
        payment.completed_at = payment.completed_at.or(write.completed_at);

        inner
            .history
            .entry(payment_id.to_string())
            .or_default()
            .push(write.entry.clone());
        if let Some(dispute) = &write.dispute {
            inner.disputes.insert(dispute.id.clone(), dispute.clone());
        }
        Ok(true)
    }

    async fn set_provider_order(
        &self,
        payment_id: &str,
        provider_order_id: &str,
    ) -> Result<(), EscrowError> {
        let mut inner = self.inner.lock().await;
        let payment = inner
            .payments
            .get_mut(payment_id)
            .ok_or_else(|| EscrowError::NotFound(payment_id.to_string()))?;
        payment.provider_order_id = Some(provider_order_id.to_string());
        Ok(())
    }

    async fn history(&self, payment_id: &str) -> Result<Vec<StatusHistoryEntry>, EscrowError> {
        Ok(self
            .inner
            .lock()
            .await
            .history
            .get(payment_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_dispute(&self, id: &str) -> Result<Option<Dispute>, EscrowError> {
        Ok(self.inner.lock().await.disputes.get(id).cloned())
    }

    async fn mark_dispute_resolved(
        &self,
        id: &str,
        resolution: DisputeResolution,
        amount: Option<Decimal>,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, EscrowError> {
        let mut inner = self.inner.lock().await;
        let Some(dispute) = inner.disputes.get_mut(id) else {
            return Ok(false);
        };
        if dispute.resolved_at.is_some() {
            return Ok(false);
        }
        dispute.resolution = Some(resolution);
        dispute.resolution_amount = amount;
        dispute.resolved_at = Some(resolved_at);
        Ok(true)
    }

    async fn release_candidates(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Payment>, EscrowError> {
        let inner = self.inner.lock().await;
        let mut candidates: Vec<Payment> = inner
            .payments
            .values()
            .filter(|p| {
                p.status == PaymentStatus::Delivered
                    && p.delivered_at.is_some_and(|d| d <= cutoff)
            })
            .cloned()
            .collect();
        candidates.sort_by_key(|p| p.delivered_at);
        candidates.truncate(limit as usize);
        Ok(candidates)
    }
}
