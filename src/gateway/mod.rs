pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tracing::info;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::EscrowError;
use state::AppState;

/// Build the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let payment_routes = Router::new()
        .route("/payments", post(handlers::create_payment))
        .route("/payments/{id}", get(handlers::get_payment))
        .route("/payments/{id}/order", post(handlers::create_order))
        .route("/payments/{id}/sync", post(handlers::sync_payment))
        .route("/payments/{id}/deliver", post(handlers::deliver))
        .route("/payments/{id}/validate", post(handlers::validate))
        .route("/payments/{id}/disputes", post(handlers::create_dispute))
        .route("/disputes/{id}/resolve", post(handlers::resolve_dispute))
        // The webhook handler consumes the raw body: no Json extractor may
        // run before the signature check.
        .route("/webhooks/provider", post(handlers::provider_webhook));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", payment_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Start the HTTP gateway server
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> Result<(), EscrowError> {
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| EscrowError::System(format!("failed to bind {}: {}", addr, e)))?;

    info!("Gateway listening on http://{}", addr);
    info!("API docs at http://{}/docs", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| EscrowError::System(format!("server error: {}", e)))
}
