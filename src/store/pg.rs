//! PostgreSQL Payment Store
//!
//! Schema (see `schema.sql`):
//! - `payments_tb` — one row per payment, status as SMALLINT
//! - `payment_history_tb` — append-only status history
//! - `disputes_tb` — one row per dispute

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::{PaymentStore, StatusWrite};
use crate::error::EscrowError;
use crate::models::{Dispute, DisputeResolution, Payment, StatusHistoryEntry, TriggeredBy};
use crate::status::PaymentStatus;

pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_payment(row: &PgRow) -> Result<Payment, EscrowError> {
        let status_id: i16 = row.try_get("status").map_err(sqlx_field)?;
        let status = PaymentStatus::from_id(status_id)
            .ok_or_else(|| EscrowError::Database(format!("unknown status id {}", status_id)))?;

        Ok(Payment {
            id: row.try_get("id").map_err(sqlx_field)?,
            amount: row.try_get("amount").map_err(sqlx_field)?,
            currency: row.try_get("currency").map_err(sqlx_field)?,
            status,
            freelancer_id: row.try_get("freelancer_id").map_err(sqlx_field)?,
            client_email: row.try_get("client_email").map_err(sqlx_field)?,
            project_name: row.try_get("project_name").map_err(sqlx_field)?,
            created_at: row.try_get("created_at").map_err(sqlx_field)?,
            expires_at: row.try_get("expires_at").map_err(sqlx_field)?,
            paid_at: row.try_get("paid_at").map_err(sqlx_field)?,
            delivered_at: row.try_get("delivered_at").map_err(sqlx_field)?,
            completed_at: row.try_get("completed_at").map_err(sqlx_field)?,
            provider_order_id: row.try_get("provider_order_id").map_err(sqlx_field)?,
        })
    }

    fn row_to_history(row: &PgRow) -> Result<StatusHistoryEntry, EscrowError> {
        let status_id: i16 = row.try_get("status").map_err(sqlx_field)?;
        let triggered_id: i16 = row.try_get("triggered_by").map_err(sqlx_field)?;

        Ok(StatusHistoryEntry {
            payment_id: row.try_get("payment_id").map_err(sqlx_field)?,
            status: PaymentStatus::from_id(status_id)
                .ok_or_else(|| EscrowError::Database(format!("unknown status id {}", status_id)))?,
            timestamp: row.try_get("ts").map_err(sqlx_field)?,
            triggered_by: TriggeredBy::from_id(triggered_id).ok_or_else(|| {
                EscrowError::Database(format!("unknown triggered_by id {}", triggered_id))
            })?,
            note: row.try_get("note").map_err(sqlx_field)?,
        })
    }

    fn row_to_dispute(row: &PgRow) -> Result<Dispute, EscrowError> {
        let resolution_id: Option<i16> = row.try_get("resolution").map_err(sqlx_field)?;
        let resolution = match resolution_id {
            Some(id) => Some(DisputeResolution::from_id(id).ok_or_else(|| {
                EscrowError::Database(format!("unknown resolution id {}", id))
            })?),
            None => None,
        };

        Ok(Dispute {
            id: row.try_get("id").map_err(sqlx_field)?,
            payment_id: row.try_get("payment_id").map_err(sqlx_field)?,
            reason: row.try_get("reason").map_err(sqlx_field)?,
            description: row.try_get("description").map_err(sqlx_field)?,
            evidence: row.try_get("evidence").map_err(sqlx_field)?,
            created_at: row.try_get("created_at").map_err(sqlx_field)?,
            resolved_at: row.try_get("resolved_at").map_err(sqlx_field)?,
            resolution,
            resolution_amount: row.try_get("resolution_amount").map_err(sqlx_field)?,
        })
    }
}

fn sqlx_field(e: sqlx::Error) -> EscrowError {
    EscrowError::Database(e.to_string())
}

#[async_trait]
impl PaymentStore for PgPaymentStore {
    async fn create_payment(&self, payment: &Payment) -> Result<(), EscrowError> {
        sqlx::query(
            r#"
            INSERT INTO payments_tb
                (id, amount, currency, status, freelancer_id, client_email, project_name,
                 created_at, expires_at, provider_order_id, updated_at)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
            "#,
        )
        .bind(&payment.id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.status.id())
        .bind(&payment.freelancer_id)
        .bind(&payment.client_email)
        .bind(&payment.project_name)
        .bind(payment.created_at)
        .bind(payment.expires_at)
        .bind(&payment.provider_order_id)
        .execute(&self.pool)
        .await?;

        // Seed the history with the creation status so the invariant
        // "current status == latest history entry" holds from row one.
        sqlx::query(
            r#"
            INSERT INTO payment_history_tb (payment_id, status, triggered_by, note, ts)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&payment.id)
        .bind(payment.status.id())
        .bind(TriggeredBy::System.id())
        .bind("Payment link created")
        .bind(payment.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_payment(&self, id: &str) -> Result<Option<Payment>, EscrowError> {
        let row = sqlx::query("SELECT * FROM payments_tb WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Self::row_to_payment(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_payment_by_provider_order(
        &self,
        provider_order_id: &str,
    ) -> Result<Option<Payment>, EscrowError> {
        let row = sqlx::query("SELECT * FROM payments_tb WHERE provider_order_id = $1")
            .bind(provider_order_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Self::row_to_payment(&row)?)),
            None => Ok(None),
        }
    }

    async fn update_status_if(
        &self,
        payment_id: &str,
        expected: PaymentStatus,
        write: &StatusWrite,
    ) -> Result<bool, EscrowError> {
        let mut tx = self.pool.begin().await?;

        // CAS on the status column. COALESCE keeps already-set lifecycle
        // timestamps from being overwritten on any later transition.
        let result = sqlx::query(
            r#"
            UPDATE payments_tb
            SET status = $1,
                paid_at = COALESCE(paid_at, $2),
                delivered_at = COALESCE(delivered_at, $3),
                completed_at = COALESCE(completed_at, $4),
                updated_at = NOW()
            WHERE id = $5 AND status = $6
            "#,
        )
        .bind(write.entry.status.id())
        .bind(write.paid_at)
        .bind(write.delivered_at)
        .bind(write.completed_at)
        .bind(payment_id)
        .bind(expected.id())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO payment_history_tb (payment_id, status, triggered_by, note, ts)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&write.entry.payment_id)
        .bind(write.entry.status.id())
        .bind(write.entry.triggered_by.id())
        .bind(&write.entry.note)
        .bind(write.entry.timestamp)
        .execute(&mut *tx)
        .await?;

        // A dispute row rides in the same transaction as its contested write
        if let Some(dispute) = &write.dispute {
            sqlx::query(
                r#"
                INSERT INTO disputes_tb
                    (id, payment_id, reason, description, evidence, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(&dispute.id)
            .bind(&dispute.payment_id)
            .bind(&dispute.reason)
            .bind(&dispute.description)
            .bind(&dispute.evidence)
            .bind(dispute.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn set_provider_order(
        &self,
        payment_id: &str,
        provider_order_id: &str,
    ) -> Result<(), EscrowError> {
        let result = sqlx::query(
            "UPDATE payments_tb SET provider_order_id = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(provider_order_id)
        .bind(payment_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EscrowError::NotFound(payment_id.to_string()));
        }
        Ok(())
    }

    async fn history(&self, payment_id: &str) -> Result<Vec<StatusHistoryEntry>, EscrowError> {
        let rows = sqlx::query(
            "SELECT payment_id, status, triggered_by, note, ts
             FROM payment_history_tb WHERE payment_id = $1 ORDER BY id ASC",
        )
        .bind(payment_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_history).collect()
    }

    async fn get_dispute(&self, id: &str) -> Result<Option<Dispute>, EscrowError> {
        let row = sqlx::query("SELECT * FROM disputes_tb WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Self::row_to_dispute(&row)?)),
            None => Ok(None),
        }
    }

    async fn mark_dispute_resolved(
        &self,
        id: &str,
        resolution: DisputeResolution,
        amount: Option<Decimal>,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, EscrowError> {
        // CAS on resolved_at: a dispute resolves exactly once.
        let result = sqlx::query(
            r#"
            UPDATE disputes_tb
            SET resolution = $1, resolution_amount = $2, resolved_at = $3
            WHERE id = $4 AND resolved_at IS NULL
            "#,
        )
        .bind(resolution.id())
        .bind(amount)
        .bind(resolved_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn release_candidates(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Payment>, EscrowError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM payments_tb
            WHERE status = $1 AND delivered_at IS NOT NULL AND delivered_at <= $2
            ORDER BY delivered_at ASC
            LIMIT $3
            "#,
        )
        .bind(PaymentStatus::Delivered.id())
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_payment).collect()
    }
}
