//! System endpoints: health check and generation catalog.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::{AspectRatio, DownloadQuality};
use crate::service::GENERATION_COST;

/// Liveness report.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: String,
    /// Open WebSocket connections.
    event_listeners: usize,
}

/// `GET /health` — Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Reports the build version, server time and the number of open event streams.",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
        event_listeners: state.event_bus.receiver_count(),
    })
}

/// Download quality option.
#[derive(Debug, Serialize, ToSchema)]
pub struct QualityInfo {
    quality: &'static str,
    file_suffix: &'static str,
}

/// Generation options offered to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct GenerationCatalog {
    aspect_ratios: Vec<&'static str>,
    qualities: Vec<QualityInfo>,
    credits_per_image: u64,
}

/// `GET /config/catalog` — Aspect ratios and download qualities.
#[utoipa::path(
    get,
    path = "/config/catalog",
    tag = "System",
    summary = "Generation options",
    description = "Lists the supported aspect ratios, download quality tags and the credit cost of one image.",
    responses(
        (status = 200, description = "Generation catalog", body = GenerationCatalog),
    )
)]
pub async fn catalog_handler() -> impl IntoResponse {
    let catalog = GenerationCatalog {
        aspect_ratios: AspectRatio::ALL.iter().map(AspectRatio::as_str).collect(),
        qualities: DownloadQuality::ALL
            .iter()
            .map(|q| QualityInfo {
                quality: q.as_str(),
                file_suffix: q.tag(),
            })
            .collect(),
        credits_per_image: GENERATION_COST,
    };
    Json(catalog)
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/catalog", get(catalog_handler))
}
