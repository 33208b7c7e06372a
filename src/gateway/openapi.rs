//! OpenAPI / Swagger UI Documentation
//!
//! Auto-generated OpenAPI 3.0 documentation for the escrow API.
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::gateway::types::{
    CreateDisputeRequest, CreateOrderRequest, CreatePaymentRequest, DeliverRequest,
    HealthResponse, PaymentDetail, ResolveDisputeRequest, SyncResponse, ValidateRequest,
};
use crate::models::{Dispute, DisputeResolution, Payment, StatusHistoryEntry, TriggeredBy};
use crate::provider::{CaptureMode, CreatedOrder};
use crate::status::PaymentStatus;

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Heldpay Escrow API",
        version = "1.0.0",
        description = "Escrow payment lifecycle engine: payment links, provider checkout, \
                       delivery validation, auto-release and dispute resolution.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health,
        crate::gateway::handlers::create_payment,
        crate::gateway::handlers::get_payment,
        crate::gateway::handlers::create_order,
        crate::gateway::handlers::sync_payment,
        crate::gateway::handlers::deliver,
        crate::gateway::handlers::validate,
        crate::gateway::handlers::create_dispute,
        crate::gateway::handlers::resolve_dispute,
        crate::gateway::handlers::provider_webhook,
    ),
    components(
        schemas(
            PaymentStatus,
            TriggeredBy,
            Payment,
            StatusHistoryEntry,
            Dispute,
            DisputeResolution,
            CaptureMode,
            CreatedOrder,
            CreatePaymentRequest,
            CreateOrderRequest,
            DeliverRequest,
            ValidateRequest,
            CreateDisputeRequest,
            ResolveDisputeRequest,
            PaymentDetail,
            SyncResponse,
            HealthResponse,
        )
    ),
    tags(
        (name = "Payments", description = "Payment link creation and provider checkout"),
        (name = "Lifecycle", description = "Delivery, validation and release"),
        (name = "Disputes", description = "Dispute creation and resolution"),
        (name = "Webhooks", description = "Provider event ingestion"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;
