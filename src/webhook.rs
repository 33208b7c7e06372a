//! Webhook Ingestor
//!
//! Authenticates and dispatches inbound provider events. The contract is
//! strict: the HMAC is computed over the exact raw bytes the provider sent
//! (never a re-serialized form), compared in constant time, and nothing is
//! processed unless the signature verifies.
//!
//! Response discipline (the provider retries on non-2xx):
//! - bad/missing signature  -> 401, always
//! - processed or no-op     -> 200
//! - business rejection     -> 200 (retrying "already released" is pointless)
//! - storage failure        -> 500 (retry may succeed)

use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{info, warn};

use crate::error::EscrowError;
use crate::ledger::{Applied, EscrowLedger};
use crate::models::TriggeredBy;
use crate::provider::map_provider_state;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "X-Provider-Signature";

const HANDLED_EVENTS: [&str; 4] = [
    "ORDER_COMPLETED",
    "ORDER_FAILED",
    "ORDER_CANCELLED",
    "ORDER_AUTHORISED",
];

/// Inbound event payload (only the fields the core consumes)
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    pub data: WebhookOrderData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookOrderData {
    /// Provider order id
    pub id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub merchant_order_ext_ref: Option<String>,
}

/// What happened to a verified event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A status transition was applied
    Applied,
    /// Verified and understood, but nothing to change (replay, non-final
    /// state, or a transition the status graph forbids)
    NoOp,
    /// Unknown event type or unresolvable payment - logged and dropped
    Ignored,
}

/// Verify `sha256=<hex>` over the raw body with the shared webhook secret.
///
/// Constant-time comparison via [`Mac::verify_slice`]; a missing header, a
/// malformed hex digest and a wrong MAC are indistinguishable to the caller.
pub fn verify_signature(
    secret: &str,
    raw_body: &[u8],
    signature_header: Option<&str>,
) -> Result<(), EscrowError> {
    let header = signature_header.ok_or(EscrowError::SignatureInvalid)?;
    let hex_digest = header
        .strip_prefix("sha256=")
        .ok_or(EscrowError::SignatureInvalid)?;
    let claimed = hex::decode(hex_digest).map_err(|_| EscrowError::SignatureInvalid)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| EscrowError::SignatureInvalid)?;
    mac.update(raw_body);
    mac.verify_slice(&claimed)
        .map_err(|_| EscrowError::SignatureInvalid)
}

pub struct WebhookIngestor {
    ledger: Arc<EscrowLedger>,
    webhook_secret: String,
}

impl WebhookIngestor {
    pub fn new(ledger: Arc<EscrowLedger>, webhook_secret: String) -> Self {
        Self {
            ledger,
            webhook_secret,
        }
    }

    /// Verify, parse and dispatch one raw webhook delivery.
    pub async fn ingest(
        &self,
        raw_body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<IngestOutcome, EscrowError> {
        verify_signature(&self.webhook_secret, raw_body, signature_header)?;

        let event: WebhookEvent = match serde_json::from_slice(raw_body) {
            Ok(e) => e,
            Err(e) => {
                // Authenticated but unparseable - the provider will not send
                // anything different on retry.
                warn!(error = %e, "Verified webhook body failed to parse - dropping");
                return Ok(IngestOutcome::Ignored);
            }
        };

        if !HANDLED_EVENTS.contains(&event.event.as_str()) {
            info!(event = %event.event, "Unhandled webhook event type - ignoring");
            return Ok(IngestOutcome::Ignored);
        }

        let Some(payment) = self.resolve_payment(&event.data).await? else {
            warn!(
                provider_order_id = %event.data.id,
                ext_ref = event.data.merchant_order_ext_ref.as_deref().unwrap_or(""),
                "Webhook references no known payment - ignoring"
            );
            return Ok(IngestOutcome::Ignored);
        };

        let provider_state = event
            .data
            .state
            .as_deref()
            .unwrap_or_else(|| implied_state(&event.event));
        let target = map_provider_state(provider_state);

        match self
            .ledger
            .apply_status(
                &payment.id,
                target,
                TriggeredBy::System,
                Some(format!("Webhook {} ({})", event.event, provider_state)),
            )
            .await
        {
            Ok(Applied::Transitioned) => {
                info!(
                    payment_id = %payment.id,
                    event = %event.event,
                    status = %target,
                    "Webhook applied"
                );
                Ok(IngestOutcome::Applied)
            }
            Ok(Applied::NoOp) => Ok(IngestOutcome::NoOp),
            Err(EscrowError::InvalidTransition { from, to }) => {
                // e.g. ORDER_FAILED after the payment moved past pending, or
                // a COMPLETED replay on a released payment. Acknowledge so
                // the provider stops retrying.
                info!(
                    payment_id = %payment.id,
                    from = %from,
                    to = %to,
                    "Webhook transition rejected by status graph - acknowledged as no-op"
                );
                Ok(IngestOutcome::NoOp)
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve the payment: `merchant_order_ext_ref` is preferred (it was
    /// set to the payment id at order creation); fallback is the provider
    /// order id join key.
    async fn resolve_payment(
        &self,
        data: &WebhookOrderData,
    ) -> Result<Option<crate::models::Payment>, EscrowError> {
        if let Some(ext_ref) = data.merchant_order_ext_ref.as_deref()
            && let Some(payment) = self.ledger.store().get_payment(ext_ref).await?
        {
            return Ok(Some(payment));
        }
        self.ledger
            .store()
            .get_payment_by_provider_order(&data.id)
            .await
    }
}

/// Provider state implied by the event type, for payloads that omit `state`
fn implied_state(event: &str) -> &'static str {
    match event {
        "ORDER_COMPLETED" => "COMPLETED",
        "ORDER_FAILED" => "FAILED",
        "ORDER_CANCELLED" => "CANCELLED",
        "ORDER_AUTHORISED" => "AUTHORISED",
        _ => "PENDING",
    }
}

/// Compute the signature header value for a body (tests, demo tooling)
pub fn sign_body(secret: &str, raw_body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key size");
    mac.update(raw_body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
