//! API response envelope, error mapping and request/response DTOs

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::EscrowError;
use crate::models::{DisputeResolution, Payment, StatusHistoryEntry};
use crate::provider::CaptureMode;
use crate::status::PaymentStatus;

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or null (error)
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    #[schema(example = 0)]
    pub code: i32,
    #[schema(example = "ok")]
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }
}

/// Standard API error codes
pub mod error_codes {
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INVALID_TRANSITION: i32 = 1002;
    pub const DISPUTE_ALREADY_RESOLVED: i32 = 1003;

    // Auth errors (2xxx)
    pub const FORBIDDEN: i32 = 2001;
    pub const SIGNATURE_INVALID: i32 = 2002;

    // Resource errors (4xxx)
    pub const PAYMENT_NOT_FOUND: i32 = 4001;
    pub const DISPUTE_NOT_FOUND: i32 = 4002;
    pub const WRITE_CONFLICT: i32 = 4091;

    // Server / upstream errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const PROVIDER_ERROR: i32 = 5020;
}

/// API error that renders as the unified envelope with an HTTP status
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: error_codes::INVALID_PARAMETER,
            msg: msg.into(),
        }
    }
}

impl From<EscrowError> for ApiError {
    fn from(e: EscrowError) -> Self {
        let code = match &e {
            EscrowError::NotFound(_) => error_codes::PAYMENT_NOT_FOUND,
            EscrowError::DisputeNotFound(_) => error_codes::DISPUTE_NOT_FOUND,
            EscrowError::InvalidTransition { .. } => error_codes::INVALID_TRANSITION,
            EscrowError::DisputeAlreadyResolved(_) => error_codes::DISPUTE_ALREADY_RESOLVED,
            EscrowError::PersistenceConflict(_) => error_codes::WRITE_CONFLICT,
            EscrowError::Forbidden(_) => error_codes::FORBIDDEN,
            EscrowError::SignatureInvalid => error_codes::SIGNATURE_INVALID,
            EscrowError::InvalidAmount => error_codes::INVALID_PARAMETER,
            EscrowError::ProviderError(_) => error_codes::PROVIDER_ERROR,
            EscrowError::Database(_) | EscrowError::System(_) => error_codes::INTERNAL_ERROR,
        };
        Self {
            status: StatusCode::from_u16(e.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code,
            msg: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            code: self.code,
            msg: self.msg,
            data: None,
        };
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    /// Major-unit amount, e.g. "150.00"
    #[schema(value_type = String, example = "150.00")]
    pub amount: Decimal,
    #[schema(example = "EUR")]
    pub currency: String,
    pub freelancer_id: String,
    pub client_email: String,
    pub project_name: String,
    /// Days until the payment link expires (default 30)
    #[serde(default)]
    pub expires_in_days: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub capture_mode: Option<CaptureMode>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeliverRequest {
    pub freelancer_id: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateRequest {
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDisputeRequest {
    pub reason: String,
    pub description: String,
    #[serde(default)]
    pub evidence: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveDisputeRequest {
    pub resolution: DisputeResolution,
    /// Required for partial refunds, ignored otherwise
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "50.00")]
    pub amount: Option<Decimal>,
}

// ============================================================================
// Response DTOs
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentDetail {
    #[serde(flatten)]
    pub payment: Payment,
    pub available_transitions: Vec<PaymentStatus>,
    pub history: Vec<StatusHistoryEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncResponse {
    pub status: PaymentStatus,
    /// Last provider state observed, if the poll reached the provider
    pub provider_state: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Git revision baked in at build time
    pub build: &'static str,
    pub now: DateTime<Utc>,
}
