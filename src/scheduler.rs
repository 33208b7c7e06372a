//! Auto-Release Scheduler
//!
//! Background worker that enforces the auto-release SLA: delivered payments
//! the client never validated are released after the window (default 5
//! days). Safe to run concurrently and repeatedly - the ledger's CAS and
//! replay rules make a duplicate sweep a no-op, and a dispute filed moments
//! before the sweep wins because candidacy is re-checked at write time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::config::AutoReleaseConfig;
use crate::error::EscrowError;
use crate::ledger::{Applied, EscrowLedger};
use crate::models::TriggeredBy;

/// Pure window predicate: true once `window_days` whole days have elapsed
/// since delivery. False at 4d23h59m, true at exactly 5d.
pub fn should_auto_release(
    delivered_at: DateTime<Utc>,
    now: DateTime<Utc>,
    window_days: i64,
) -> bool {
    now - delivered_at >= chrono::Duration::days(window_days)
}

pub struct AutoReleaseScheduler {
    ledger: Arc<EscrowLedger>,
    config: AutoReleaseConfig,
}

impl AutoReleaseScheduler {
    pub fn new(ledger: Arc<EscrowLedger>, config: AutoReleaseConfig) -> Self {
        Self { ledger, config }
    }

    /// Run the periodic sweep loop forever.
    pub async fn run(&self) -> ! {
        info!(
            window_days = self.config.window_days,
            scan_interval_secs = self.config.scan_interval_secs,
            "Starting auto-release scheduler"
        );

        loop {
            if let Err(e) = self.sweep().await {
                error!(error = %e, "Auto-release sweep failed");
            }
            tokio::time::sleep(Duration::from_secs(self.config.scan_interval_secs)).await;
        }
    }

    /// One sweep cycle. Returns how many payments were released.
    ///
    /// Per-item failures are logged and the sweep continues; one stuck
    /// payment must not block the rest of the batch.
    pub async fn sweep(&self) -> Result<usize, EscrowError> {
        let cutoff = Utc::now() - chrono::Duration::days(self.config.window_days);
        let candidates = self
            .ledger
            .store()
            .release_candidates(cutoff, self.config.batch_size)
            .await?;

        if candidates.is_empty() {
            debug!("No auto-release candidates");
            return Ok(0);
        }

        info!(count = candidates.len(), "Auto-release candidates found");

        let mut released = 0;
        for payment in &candidates {
            // The candidate set is a snapshot; validate_and_release re-reads
            // the current status, so a payment contested since the query
            // simply fails the delivered -> released edge and is skipped.
            match self
                .ledger
                .validate_and_release(
                    &payment.id,
                    TriggeredBy::System,
                    Some("Auto-release after validation window".to_string()),
                )
                .await
            {
                Ok(Applied::Transitioned) => {
                    info!(payment_id = %payment.id, "Auto-released");
                    released += 1;
                }
                Ok(Applied::NoOp) => {
                    debug!(payment_id = %payment.id, "Already released - skipping");
                }
                Err(EscrowError::InvalidTransition { from, .. }) => {
                    debug!(
                        payment_id = %payment.id,
                        current = %from,
                        "No longer releasable - skipping"
                    );
                }
                Err(e) => {
                    error!(
                        payment_id = %payment.id,
                        error = %e,
                        "Auto-release failed (continuing sweep)"
                    );
                }
            }
        }

        if released > 0 {
            info!(count = released, "Auto-released payments this sweep");
        }
        Ok(released)
    }
}
