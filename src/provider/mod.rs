//! Provider Order Service
//!
//! Adapter to the external payment provider's Merchant API: creates,
//! retrieves, captures, cancels and refunds orders, and owns the two pure
//! boundary functions (minor-unit conversion, state mapping).
//!
//! Stateless: holds only an HTTP client and credentials. Never retries
//! automatically - retrying order creation is a caller policy, since a
//! blind retry can create duplicate orders.

#[cfg(feature = "demo-provider")]
pub mod demo;
pub mod types;

use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::EscrowError;

pub use types::{
    CaptureMode, CreateOrderParams, CreatedOrder, ProviderOrder, map_provider_state,
    to_minor_units,
};

const API_VERSION_HEADER: &str = "Provider-Api-Version";

pub struct ProviderOrderService {
    client: reqwest::Client,
    config: ProviderConfig,
    demo: bool,
}

impl ProviderOrderService {
    pub fn new(config: ProviderConfig) -> Result<Self, EscrowError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| EscrowError::ProviderError(format!("http client: {}", e)))?;

        let demo = cfg!(feature = "demo-provider") && config.is_demo();
        if demo {
            warn!("Provider running in DEMO mode - orders are simulated");
        }

        Ok(Self {
            client,
            config,
            demo,
        })
    }

    /// Create a provider order for a payment.
    ///
    /// The amount is converted to integer minor units here (see
    /// [`to_minor_units`] for the rounding rule); `merchant_order_ext_ref`
    /// carries the payment id so callbacks can be joined back.
    pub async fn create_order(
        &self,
        params: CreateOrderParams,
    ) -> Result<CreatedOrder, EscrowError> {
        #[cfg(feature = "demo-provider")]
        if self.demo {
            return Ok(demo::create_demo_order(&params));
        }

        let body = types::OrderRequestBody {
            amount: to_minor_units(params.amount)?,
            currency: params.currency.to_uppercase(),
            capture_mode: params.capture_mode,
            merchant_order_ext_ref: params.merchant_order_ext_ref,
            description: params.description,
            settlement_currency: params.currency.to_uppercase(),
            email: params.customer_email,
        };

        let order: ProviderOrder = self
            .post_json(&format!("{}/orders", self.config.api_url), &body)
            .await?;

        debug!(
            provider_order_id = %order.id,
            state = %order.state,
            "Provider order created"
        );

        Ok(CreatedOrder {
            checkout_url: order
                .checkout
                .as_ref()
                .map(|c| c.url.clone())
                .unwrap_or_default(),
            provider_state: order.state.clone(),
            provider_order_id: order.id,
        })
    }

    /// Poll current provider state - the fallback reconciliation path when
    /// webhook delivery is delayed or missed.
    pub async fn get_order(&self, order_id: &str) -> Result<ProviderOrder, EscrowError> {
        #[cfg(feature = "demo-provider")]
        if self.demo || order_id.starts_with("demo_order_") {
            return Ok(demo::get_demo_order(order_id));
        }

        let resp = self
            .client
            .get(format!("{}/orders/{}", self.config.api_url, order_id))
            .bearer_auth(&self.config.secret_key)
            .header(API_VERSION_HEADER, &self.config.api_version)
            .send()
            .await
            .map_err(|e| EscrowError::ProviderError(e.to_string()))?;

        Self::decode(resp).await
    }

    /// Capture a manually-captured order (full or partial amount).
    /// Provider-side rejection (order not capturable) surfaces as
    /// `ProviderError`.
    pub async fn capture_payment(
        &self,
        order_id: &str,
        amount: Option<rust_decimal::Decimal>,
    ) -> Result<ProviderOrder, EscrowError> {
        let body = types::CaptureRequestBody::new(amount)?;
        self.post_json(
            &format!("{}/orders/{}/capture", self.config.api_url, order_id),
            &body,
        )
        .await
    }

    /// Cancel an uncaptured order. Used when a retried payment link replaces
    /// its provider order, so at most one live order exists per payment.
    pub async fn cancel_payment(&self, order_id: &str) -> Result<ProviderOrder, EscrowError> {
        #[cfg(feature = "demo-provider")]
        if self.demo || order_id.starts_with("demo_order_") {
            return Ok(demo::final_demo_order(order_id, "CANCELLED"));
        }

        self.post_json(
            &format!("{}/orders/{}/cancel", self.config.api_url, order_id),
            &serde_json::json!({}),
        )
        .await
    }

    /// Refund a completed order, fully or partially. Called by the
    /// settlement path after a dispute resolves to refund.
    pub async fn refund_order(
        &self,
        order_id: &str,
        amount: Option<rust_decimal::Decimal>,
        reason: Option<&str>,
    ) -> Result<ProviderOrder, EscrowError> {
        let body = types::RefundRequestBody::new(amount, reason)?;

        #[cfg(feature = "demo-provider")]
        if self.demo || order_id.starts_with("demo_order_") {
            return Ok(demo::final_demo_order(order_id, "COMPLETED"));
        }

        self.post_json(
            &format!("{}/orders/{}/refund", self.config.api_url, order_id),
            &body,
        )
        .await
    }

    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, EscrowError> {
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.config.secret_key)
            .header(API_VERSION_HEADER, &self.config.api_version)
            .json(body)
            .send()
            .await
            .map_err(|e| EscrowError::ProviderError(e.to_string()))?;

        Self::decode(resp).await
    }

    /// Surface the provider's own message on non-2xx.
    async fn decode<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, EscrowError> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<types::ProviderErrorBody>()
                .await
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| status_text(status));
            return Err(EscrowError::ProviderError(message));
        }

        resp.json::<T>()
            .await
            .map_err(|e| EscrowError::ProviderError(format!("malformed response: {}", e)))
    }
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}
