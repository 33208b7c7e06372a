//! Provider Wire Types
//!
//! DTOs for the payment provider's Merchant API, plus the two pure
//! boundary functions: minor-unit conversion and state mapping.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::EscrowError;
use crate::status::PaymentStatus;

/// Capture mode for provider orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptureMode {
    Automatic,
    Manual,
}

/// Internal parameters for order creation (major-unit amount)
#[derive(Debug, Clone)]
pub struct CreateOrderParams {
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    /// Set to the Payment id; the provider echoes it back in callbacks
    pub merchant_order_ext_ref: String,
    pub customer_email: Option<String>,
    pub capture_mode: CaptureMode,
}

/// Wire body for POST /orders (minor-unit amount)
#[derive(Debug, Serialize)]
pub struct OrderRequestBody {
    pub amount: i64,
    pub currency: String,
    pub capture_mode: CaptureMode,
    pub merchant_order_ext_ref: String,
    pub description: String,
    pub settlement_currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Wire body for POST /orders/{id}/capture. `None` captures the full
/// authorized amount.
#[derive(Debug, Serialize)]
pub struct CaptureRequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
}

impl CaptureRequestBody {
    pub fn new(amount: Option<Decimal>) -> Result<Self, EscrowError> {
        Ok(Self {
            amount: amount.map(to_minor_units).transpose()?,
        })
    }
}

/// Wire body for POST /orders/{id}/refund. `None` refunds the full amount.
#[derive(Debug, Serialize)]
pub struct RefundRequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RefundRequestBody {
    pub fn new(amount: Option<Decimal>, reason: Option<&str>) -> Result<Self, EscrowError> {
        Ok(Self {
            amount: amount.map(to_minor_units).transpose()?,
            description: reason.map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Checkout {
    pub url: String,
}

/// Provider order as returned by the Merchant API (read-only here)
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderOrder {
    pub id: String,
    /// Provider vocabulary: PENDING, PROCESSING, COMPLETED, CANCELLED, FAILED
    pub state: String,
    /// Minor units
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub merchant_order_ext_ref: Option<String>,
    #[serde(default)]
    pub checkout: Option<Checkout>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

/// What the caller needs after order creation
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CreatedOrder {
    pub provider_order_id: String,
    pub checkout_url: String,
    pub provider_state: String,
}

/// Error body shape the provider returns on non-2xx
#[derive(Debug, Deserialize)]
pub struct ProviderErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Convert a major-unit amount to provider minor units.
///
/// Rounding rule: scale by 100, then round half-away-from-zero to the
/// nearest integer cent. `19.999 -> 2000`. Plain float multiplication would
/// misround here, which is why amounts stay `Decimal` until this boundary.
pub fn to_minor_units(amount: Decimal) -> Result<i64, EscrowError> {
    if amount <= Decimal::ZERO {
        return Err(EscrowError::InvalidAmount);
    }
    (amount * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(EscrowError::InvalidAmount)
}

/// Map a provider state string to the internal status vocabulary.
///
/// Total: any unrecognized state is treated conservatively as non-final
/// (`pending`) so an unmapped value can never crash reconciliation.
/// `FAILED` and `CANCELLED` also map to `pending` - the payment link stays
/// retryable with a fresh provider order.
pub fn map_provider_state(state: &str) -> PaymentStatus {
    match state {
        "COMPLETED" => PaymentStatus::Paid,
        "FAILED" | "CANCELLED" => PaymentStatus::Pending,
        "PENDING" | "PROCESSING" => PaymentStatus::Pending,
        _ => PaymentStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_minor_units_rounding() {
        let cases = [
            ("19.999", 2000), // round half-up past the cent boundary
            ("19.994", 1999),
            ("19.995", 2000), // exact midpoint rounds away from zero
            ("150", 15000),
            ("0.01", 1),
            ("0.005", 1),
        ];
        for (input, expected) in cases {
            let amount = Decimal::from_str(input).unwrap();
            assert_eq!(to_minor_units(amount).unwrap(), expected, "{}", input);
        }
    }

    #[test]
    fn test_minor_units_rejects_non_positive() {
        assert!(to_minor_units(Decimal::ZERO).is_err());
        assert!(to_minor_units(Decimal::from(-5)).is_err());
    }

    #[test]
    fn test_two_decimal_amounts_roundtrip_exactly() {
        for cents in [1i64, 99, 100, 12345, 99999] {
            let amount = Decimal::new(cents, 2);
            assert_eq!(to_minor_units(amount).unwrap(), cents);
        }
    }

    #[test]
    fn test_capture_body_minor_units_and_full_capture() {
        // Full capture sends an empty body, not amount: null
        let full = CaptureRequestBody::new(None).unwrap();
        assert_eq!(serde_json::to_value(&full).unwrap(), serde_json::json!({}));

        let partial =
            CaptureRequestBody::new(Some(Decimal::from_str("19.999").unwrap())).unwrap();
        assert_eq!(
            serde_json::to_value(&partial).unwrap(),
            serde_json::json!({ "amount": 2000 })
        );

        assert!(CaptureRequestBody::new(Some(Decimal::ZERO)).is_err());
    }

    #[test]
    fn test_refund_body_minor_units_and_full_refund() {
        let full = RefundRequestBody::new(None, Some("quality dispute")).unwrap();
        assert_eq!(
            serde_json::to_value(&full).unwrap(),
            serde_json::json!({ "description": "quality dispute" })
        );

        let partial = RefundRequestBody::new(Some(Decimal::new(7550, 2)), None).unwrap();
        assert_eq!(
            serde_json::to_value(&partial).unwrap(),
            serde_json::json!({ "amount": 7550 })
        );

        assert!(RefundRequestBody::new(Some(Decimal::from(-1)), None).is_err());
    }

    #[test]
    fn test_state_mapping_enumerated() {
        assert_eq!(map_provider_state("COMPLETED"), PaymentStatus::Paid);
        assert_eq!(map_provider_state("FAILED"), PaymentStatus::Pending);
        assert_eq!(map_provider_state("CANCELLED"), PaymentStatus::Pending);
        assert_eq!(map_provider_state("PENDING"), PaymentStatus::Pending);
        assert_eq!(map_provider_state("PROCESSING"), PaymentStatus::Pending);
    }

    #[test]
    fn test_state_mapping_is_total() {
        // Unknown states must map to pending, never panic
        assert_eq!(map_provider_state("AUTHORISED"), PaymentStatus::Pending);
        assert_eq!(map_provider_state(""), PaymentStatus::Pending);
        assert_eq!(map_provider_state("garbage"), PaymentStatus::Pending);
    }
}
