use std::sync::Arc;

use crate::config::AppConfig;
use crate::ledger::EscrowLedger;
use crate::provider::ProviderOrderService;
use crate::webhook::WebhookIngestor;

/// Gateway application state (shared)
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<EscrowLedger>,
    pub provider: Arc<ProviderOrderService>,
    pub ingestor: Arc<WebhookIngestor>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        ledger: Arc<EscrowLedger>,
        provider: Arc<ProviderOrderService>,
        ingestor: Arc<WebhookIngestor>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            ledger,
            provider,
            ingestor,
            config,
        }
    }
}
