//! Heldpay - Escrow Payment Lifecycle Engine
//!
//! Holds client funds in escrow until a delivery is validated, with an
//! auditable status machine driving every movement.
//!
//! # Modules
//!
//! - [`status`] - Payment status enum and the legal transition table
//! - [`models`] - Payment, history and dispute types
//! - [`ledger`] - Transition engine: applies status changes atomically
//! - [`store`] - Persistence trait with PostgreSQL and in-memory backends
//! - [`provider`] - Payment provider Merchant API adapter
//! - [`webhook`] - Signed provider event ingestion
//! - [`scheduler`] - Auto-release sweep after the validation window
//! - [`gateway`] - HTTP API (axum) with OpenAPI docs
//! - [`notify`] - Client notification side effects

pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod notify;
pub mod provider;
pub mod scheduler;
pub mod status;
pub mod store;
pub mod webhook;

// Convenient re-exports at crate root
pub use error::EscrowError;
pub use ledger::{Applied, EscrowLedger};
pub use models::{Dispute, DisputeResolution, Payment, StatusHistoryEntry, TriggeredBy};
pub use provider::ProviderOrderService;
pub use scheduler::AutoReleaseScheduler;
pub use status::PaymentStatus;
pub use store::{MemoryStore, PaymentStore, PgPaymentStore, StatusWrite};
pub use webhook::{IngestOutcome, WebhookIngestor};
