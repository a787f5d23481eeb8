use axum::extract::{Extension, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::handlers::{analytics, data, recommendations, ws, AppState};

/// Build the HTTP/WebSocket surface of the plant service
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/ws/plant-data", get(ws::plant_data))
        .route("/ws/alerts", get(ws::alerts))
        .route("/ws/status", get(ws::status))
        .route(
            "/api/recommendations/:id/acknowledge",
            post(recommendations::acknowledge),
        )
        .route("/api/analytics/plant-report", get(analytics::plant_report))
        .route("/api/data/plant-overview", get(data::plant_overview))
        .route("/api/data/raw-material", get(data::raw_material))
        .route("/api/data/grinding", get(data::grinding))
        .route("/api/data/kiln", get(data::kiln))
        .route("/api/data/quality", get(data::quality))
        .route("/api/data/alternative-fuels", get(data::alternative_fuels))
        .route("/api/data/utilities", get(data::utilities))
        .route("/api/data/combined", get(data::combined))
        .layer(Extension(state))
        .layer(middleware::from_fn(log_request))
}

/// Handle health check endpoint
async fn handle_health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "cement-plant"
    }))
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = started.elapsed().as_millis() as u64,
        "Request completed"
    );
    response
}
