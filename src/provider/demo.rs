//! Simulated Provider Orders
//!
//! Fabricates orders so the full escrow lifecycle can be exercised without
//! provider credentials: created orders start PENDING, and any later poll
//! reports them COMPLETED. Gated behind the `demo-provider` feature.

use uuid::Uuid;

use super::types::{CreateOrderParams, CreatedOrder, ProviderOrder};

pub(super) fn create_demo_order(params: &CreateOrderParams) -> CreatedOrder {
    let order_id = format!("demo_order_{}", Uuid::new_v4().simple());
    tracing::info!(
        provider_order_id = %order_id,
        ext_ref = %params.merchant_order_ext_ref,
        "DEMO mode - simulated provider order"
    );
    CreatedOrder {
        checkout_url: format!("https://demo.checkout.invalid/pay/{}", order_id),
        provider_state: "PENDING".to_string(),
        provider_order_id: order_id,
    }
}

pub(super) fn get_demo_order(order_id: &str) -> ProviderOrder {
    // A demo order completes as soon as someone asks about it, so the
    // polling fallback drives the payment to `paid` on its own.
    ProviderOrder {
        id: order_id.to_string(),
        state: "COMPLETED".to_string(),
        amount: 0,
        currency: "EUR".to_string(),
        merchant_order_ext_ref: None,
        checkout: None,
        completed_at: Some(chrono::Utc::now().to_rfc3339()),
    }
}

/// A demo order after a lifecycle action (cancel, refund) in the given
/// terminal provider state.
pub(super) fn final_demo_order(order_id: &str, state: &str) -> ProviderOrder {
    tracing::info!(
        provider_order_id = %order_id,
        state = %state,
        "DEMO mode - simulated order action"
    );
    ProviderOrder {
        id: order_id.to_string(),
        state: state.to_string(),
        amount: 0,
        currency: "EUR".to_string(),
        merchant_order_ext_ref: None,
        checkout: None,
        completed_at: None,
    }
}
