//! Health check endpoint.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// GET /health for the inventory service.
pub async fn inventory() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "inventory",
    })
}

/// GET /health for the order service.
pub async fn orders() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "orders",
    })
}
