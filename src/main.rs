//! Heldpay - Escrow Payment Lifecycle Engine
//!
//! Service entry point. Architecture:
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌──────────┐
//! │ Gateway  │───▶│  Ledger  │───▶│  Store   │    │ Provider │
//! │ (axum)   │    │  (FSM)   │    │ (PG/mem) │◀───│ webhooks │
//! └──────────┘    └──────────┘    └──────────┘    └──────────┘
//!
//! Ledger responsibilities:
//! - Enforce the status transition graph
//! - Atomic status writes (CAS) with history append
//! - Notification side effects after committed transitions
//! ```

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use heldpay::config::AppConfig;
use heldpay::db::Database;
use heldpay::gateway::{self, state::AppState};
use heldpay::ledger::EscrowLedger;
use heldpay::logging::init_logging;
use heldpay::notify::{HttpNotifier, LogNotifier, Notifier};
use heldpay::provider::ProviderOrderService;
use heldpay::scheduler::AutoReleaseScheduler;
use heldpay::store::{MemoryStore, PaymentStore, PgPaymentStore};
use heldpay::webhook::WebhookIngestor;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env);
    let _log_guard = init_logging(&config);

    info!(env = %env, "Starting heldpay v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn PaymentStore> = match &config.postgres_url {
        Some(url) => {
            let db = Database::connect(url)
                .await
                .context("PostgreSQL connection failed")?;
            db.health_check().await.context("PostgreSQL unhealthy")?;
            Arc::new(PgPaymentStore::new(db.pool().clone()))
        }
        None => {
            warn!("No postgres_url configured - using in-memory store (data is not durable)");
            Arc::new(MemoryStore::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.mailer_url {
        Some(url) => Arc::new(HttpNotifier::new(url.clone())),
        None => {
            warn!("No mailer_url configured - notifications are log-only");
            Arc::new(LogNotifier)
        }
    };

    let ledger = Arc::new(EscrowLedger::new(store, notifier));
    let provider = Arc::new(
        ProviderOrderService::new(config.provider.clone())
            .context("provider client init failed")?,
    );
    let ingestor = Arc::new(WebhookIngestor::new(
        ledger.clone(),
        config.provider.webhook_secret.clone(),
    ));

    let scheduler = AutoReleaseScheduler::new(ledger.clone(), config.auto_release.clone());
    tokio::spawn(async move {
        scheduler.run().await;
    });
    info!(
        window_days = config.auto_release.window_days,
        "Auto-release scheduler started"
    );

    let config = Arc::new(config);
    let state = Arc::new(AppState::new(ledger, provider, ingestor, config.clone()));

    gateway::run_server(&config.gateway.host, config.gateway.port, state)
        .await
        .context("gateway server failed")?;

    Ok(())
}
