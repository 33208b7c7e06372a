//! HTTP handlers for the escrow lifecycle API

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tracing::{error, warn};
use uuid::Uuid;

use super::state::AppState;
use super::types::{
    ApiError, ApiResponse, ApiResult, CreateDisputeRequest, CreateOrderRequest,
    CreatePaymentRequest,
    DeliverRequest, HealthResponse, PaymentDetail, ResolveDisputeRequest, SyncResponse,
    ValidateRequest, ok,
};
use crate::error::EscrowError;
use crate::models::{Dispute, Payment, TriggeredBy};
use crate::provider::{CaptureMode, CreateOrderParams, CreatedOrder, map_provider_state};
use crate::status::PaymentStatus;
use crate::webhook::SIGNATURE_HEADER;

/// Liveness check
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "System"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        build: env!("GIT_HASH"),
        now: Utc::now(),
    })
}

/// Create a payment link record (starts in `pending`)
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Payment created", body = ApiResponse<Payment>),
        (status = 400, description = "Invalid parameters")
    ),
    tag = "Payments"
)]
pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePaymentRequest>,
) -> ApiResult<Payment> {
    if req.amount <= Decimal::ZERO {
        return Err(EscrowError::InvalidAmount.into());
    }
    if req.currency.len() != 3 {
        return Err(ApiError::bad_request("currency must be an ISO 4217 code"));
    }

    let now = Utc::now();
    let payment = Payment {
        id: format!("pay_{}", Uuid::new_v4().simple()),
        amount: req.amount,
        currency: req.currency.to_uppercase(),
        status: PaymentStatus::Pending,
        freelancer_id: req.freelancer_id,
        client_email: req.client_email,
        project_name: req.project_name,
        created_at: now,
        expires_at: now + Duration::days(req.expires_in_days.unwrap_or(30)),
        paid_at: None,
        delivered_at: None,
        completed_at: None,
        provider_order_id: None,
    };

    state.ledger.store().create_payment(&payment).await?;
    ok(payment)
}

/// Fetch a payment with its history and the transitions currently available
#[utoipa::path(
    get,
    path = "/api/v1/payments/{id}",
    params(("id" = String, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment detail", body = ApiResponse<PaymentDetail>),
        (status = 404, description = "Unknown payment")
    ),
    tag = "Payments"
)]
pub async fn get_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<PaymentDetail> {
    let payment = state
        .ledger
        .store()
        .get_payment(&id)
        .await?
        .ok_or(EscrowError::NotFound(id.clone()))?;
    let history = state.ledger.store().history(&id).await?;

    ok(PaymentDetail {
        available_transitions: payment.status.available_transitions().to_vec(),
        payment,
        history,
    })
}

/// Create a provider order for a pending payment and return the checkout URL
#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/order",
    params(("id" = String, Path, description = "Payment id")),
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Provider order created", body = ApiResponse<CreatedOrder>),
        (status = 404, description = "Unknown payment"),
        (status = 502, description = "Provider rejected the order")
    ),
    tag = "Payments"
)]
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<CreatedOrder> {
    let payment = state
        .ledger
        .store()
        .get_payment(&id)
        .await?
        .ok_or(EscrowError::NotFound(id.clone()))?;

    if payment.status != PaymentStatus::Pending {
        return Err(ApiError::bad_request(format!(
            "orders can only be created for pending payments (current: {})",
            payment.status
        )));
    }

    // A retried link replaces its provider order; cancel the superseded one
    // so only the new order can complete against this payment.
    if let Some(old_order) = payment.provider_order_id.as_deref()
        && let Err(e) = state.provider.cancel_payment(old_order).await
    {
        warn!(
            payment_id = %id,
            provider_order_id = %old_order,
            error = %e,
            "Failed to cancel superseded provider order"
        );
    }

    let created = state
        .provider
        .create_order(CreateOrderParams {
            amount: payment.amount,
            currency: payment.currency.clone(),
            description: payment.project_name.clone(),
            // The ext-ref is the payment id: the provider echoes it back in
            // every callback and it becomes the reconciliation join key.
            merchant_order_ext_ref: payment.id.clone(),
            customer_email: Some(payment.client_email.clone()),
            capture_mode: req.capture_mode.unwrap_or(CaptureMode::Automatic),
        })
        .await?;

    // Overwrites any previous (failed/cancelled) order id, keeping at most
    // one live provider order per payment.
    state
        .ledger
        .store()
        .set_provider_order(&id, &created.provider_order_id)
        .await?;

    ok(created)
}

/// Polling fallback: ask the provider for the order state and reconcile
#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/sync",
    params(("id" = String, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Reconciled (or no new information)", body = ApiResponse<SyncResponse>),
        (status = 404, description = "Unknown payment")
    ),
    tag = "Payments"
)]
pub async fn sync_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SyncResponse> {
    let payment = state
        .ledger
        .store()
        .get_payment(&id)
        .await?
        .ok_or(EscrowError::NotFound(id.clone()))?;

    let Some(order_id) = payment.provider_order_id.clone() else {
        return ok(SyncResponse {
            status: payment.status,
            provider_state: None,
        });
    };

    // A provider error while polling is "no new information": report the
    // current status and let the next webhook or poll reconcile.
    let order = match state.provider.get_order(&order_id).await {
        Ok(order) => order,
        Err(EscrowError::ProviderError(msg)) => {
            warn!(payment_id = %id, error = %msg, "Poll failed - deferring");
            return ok(SyncResponse {
                status: payment.status,
                provider_state: None,
            });
        }
        Err(e) => return Err(e.into()),
    };

    let target = map_provider_state(&order.state);
    match state
        .ledger
        .apply_status(
            &id,
            target,
            TriggeredBy::System,
            Some(format!("Poll reconciliation ({})", order.state)),
        )
        .await
    {
        Ok(_) => {}
        // Stale poll result racing a webhook: the graph already rejected it.
        Err(EscrowError::InvalidTransition { .. }) => {}
        Err(e) => return Err(e.into()),
    }

    let current = state
        .ledger
        .store()
        .get_payment(&id)
        .await?
        .ok_or(EscrowError::NotFound(id))?;
    ok(SyncResponse {
        status: current.status,
        provider_state: Some(order.state),
    })
}

/// Freelancer marks the project delivered (starts the validation window)
#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/deliver",
    params(("id" = String, Path, description = "Payment id")),
    request_body = DeliverRequest,
    responses(
        (status = 200, description = "Marked delivered", body = ApiResponse<Payment>),
        (status = 403, description = "Not the payment owner"),
        (status = 422, description = "Payment is not paid")
    ),
    tag = "Lifecycle"
)]
pub async fn deliver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<DeliverRequest>,
) -> ApiResult<Payment> {
    state
        .ledger
        .mark_as_delivered(&id, &req.freelancer_id, req.note)
        .await?;
    let payment = state
        .ledger
        .store()
        .get_payment(&id)
        .await?
        .ok_or(EscrowError::NotFound(id))?;
    ok(payment)
}

/// Client validates the delivery, releasing funds to the freelancer
#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/validate",
    params(("id" = String, Path, description = "Payment id")),
    request_body = ValidateRequest,
    responses(
        (status = 200, description = "Funds released", body = ApiResponse<Payment>),
        (status = 422, description = "Payment is not delivered")
    ),
    tag = "Lifecycle"
)]
pub async fn validate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ValidateRequest>,
) -> ApiResult<Payment> {
    state
        .ledger
        .validate_and_release(&id, TriggeredBy::Client, req.note)
        .await?;
    let payment = state
        .ledger
        .store()
        .get_payment(&id)
        .await?
        .ok_or(EscrowError::NotFound(id))?;
    ok(payment)
}

/// Client opens a dispute against a paid or delivered payment
#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/disputes",
    params(("id" = String, Path, description = "Payment id")),
    request_body = CreateDisputeRequest,
    responses(
        (status = 200, description = "Dispute opened", body = ApiResponse<Dispute>),
        (status = 422, description = "Payment cannot be disputed in its current status")
    ),
    tag = "Disputes"
)]
pub async fn create_dispute(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateDisputeRequest>,
) -> ApiResult<Dispute> {
    let dispute = state
        .ledger
        .create_dispute(&id, &req.reason, &req.description, req.evidence)
        .await?;
    ok(dispute)
}

/// Admin resolves a dispute (release, refund or partial refund)
#[utoipa::path(
    post,
    path = "/api/v1/disputes/{id}/resolve",
    params(("id" = String, Path, description = "Dispute id")),
    request_body = ResolveDisputeRequest,
    responses(
        (status = 200, description = "Dispute resolved", body = ApiResponse<Dispute>),
        (status = 404, description = "Unknown dispute"),
        (status = 422, description = "Already resolved or invalid amount")
    ),
    tag = "Disputes"
)]
pub async fn resolve_dispute(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ResolveDisputeRequest>,
) -> ApiResult<Dispute> {
    let dispute = state
        .ledger
        .resolve_dispute(&id, req.resolution, req.amount)
        .await?;

    // Money flows back through the provider. The status column is already
    // the record of the resolution, so a refund API failure is logged for
    // settlement follow-up rather than failing the resolution.
    if dispute
        .resolution
        .is_some_and(|r| r.final_status() == PaymentStatus::Refunded)
        && let Ok(Some(payment)) = state.ledger.store().get_payment(&dispute.payment_id).await
        && let Some(order_id) = payment.provider_order_id.as_deref()
        && let Err(e) = state
            .provider
            .refund_order(order_id, dispute.resolution_amount, Some(dispute.reason.as_str()))
            .await
    {
        warn!(
            payment_id = %dispute.payment_id,
            provider_order_id = %order_id,
            error = %e,
            "Provider refund failed - flagged for settlement follow-up"
        );
    }

    ok(dispute)
}

/// Provider webhook endpoint.
///
/// The body is taken as raw bytes before any parsing so the signature is
/// computed over exactly what the provider sent. Responses follow the
/// retry contract: 401 stops nothing (the provider does not retry auth
/// failures), 200 acknowledges including business-level no-ops, 500 only
/// for internal faults the provider should retry.
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/provider",
    request_body(content = String, description = "Raw provider event JSON", content_type = "application/json"),
    responses(
        (status = 200, description = "Processed or intentionally ignored"),
        (status = 401, description = "Bad or missing signature"),
        (status = 500, description = "Unexpected internal failure")
    ),
    tag = "Webhooks"
)]
pub async fn provider_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    match state.ingestor.ingest(&body, signature).await {
        Ok(_) => (StatusCode::OK, "OK").into_response(),
        Err(EscrowError::SignatureInvalid) => {
            (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
        Err(e) => {
            error!(error = %e, "Webhook processing failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
