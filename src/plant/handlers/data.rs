//! Read-only plant data: headline overview and recent rows per stream.

use axum::extract::{Extension, Query};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use cement_plant::shared::domain::streams;
use cement_plant::{validate_limit, OverviewSummary, Record};

use super::AppState;
use crate::error::{ApiError, ApiFailure};

/// Bounds of the `limit` parameter for one stream; the minimum is 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentReads {
    pub stream: &'static str,
    pub default_limit: usize,
    pub max_limit: usize,
}

pub const RAW_MATERIAL: RecentReads = RecentReads {
    stream: streams::RAW_MATERIAL_FEED,
    default_limit: 3,
    max_limit: 50,
};
pub const GRINDING: RecentReads = RecentReads {
    stream: streams::GRINDING_OPERATIONS,
    default_limit: 2,
    max_limit: 20,
};
pub const KILN: RecentReads = RecentReads {
    stream: streams::KILN_OPERATIONS,
    default_limit: 1,
    max_limit: 10,
};
pub const QUALITY: RecentReads = RecentReads {
    stream: streams::QUALITY_CONTROL,
    default_limit: 1,
    max_limit: 10,
};
pub const ALTERNATIVE_FUELS: RecentReads = RecentReads {
    stream: streams::ALTERNATIVE_FUELS,
    default_limit: 2,
    max_limit: 10,
};
pub const UTILITIES: RecentReads = RecentReads {
    stream: streams::UTILITIES_MONITORING,
    default_limit: 10,
    max_limit: 50,
};

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<String>,
}

/// Body of GET /api/data/combined
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CombinedPlantData {
    pub plant_overview: OverviewSummary,
    pub raw_material: Vec<Record>,
    pub grinding: Vec<Record>,
    pub kiln: Vec<Record>,
    pub quality: Vec<Record>,
    pub alternative_fuels: Vec<Record>,
    pub utilities: Vec<Record>,
    pub timestamp: String,
}

/// GET /api/data/plant-overview
pub async fn plant_overview(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<OverviewSummary>, ApiFailure> {
    let request_id = state.ids.next_id();

    let summary = state
        .orchestrator
        .overview_summary()
        .await
        .map_err(|e| ApiError::from(e).with_request_id(&request_id))?;

    info!(
        request_id = %request_id,
        overall_efficiency = summary.overall_efficiency,
        "Plant overview served"
    );
    Ok(Json(summary))
}

/// GET /api/data/raw-material
pub async fn raw_material(
    state: Extension<Arc<AppState>>,
    params: Query<LimitParams>,
) -> Result<Json<Vec<Record>>, ApiFailure> {
    serve_recent(state, params, RAW_MATERIAL).await
}

/// GET /api/data/grinding
pub async fn grinding(
    state: Extension<Arc<AppState>>,
    params: Query<LimitParams>,
) -> Result<Json<Vec<Record>>, ApiFailure> {
    serve_recent(state, params, GRINDING).await
}

/// GET /api/data/kiln
pub async fn kiln(
    state: Extension<Arc<AppState>>,
    params: Query<LimitParams>,
) -> Result<Json<Vec<Record>>, ApiFailure> {
    serve_recent(state, params, KILN).await
}

/// GET /api/data/quality
pub async fn quality(
    state: Extension<Arc<AppState>>,
    params: Query<LimitParams>,
) -> Result<Json<Vec<Record>>, ApiFailure> {
    serve_recent(state, params, QUALITY).await
}

/// GET /api/data/alternative-fuels
pub async fn alternative_fuels(
    state: Extension<Arc<AppState>>,
    params: Query<LimitParams>,
) -> Result<Json<Vec<Record>>, ApiFailure> {
    serve_recent(state, params, ALTERNATIVE_FUELS).await
}

/// GET /api/data/utilities
pub async fn utilities(
    state: Extension<Arc<AppState>>,
    params: Query<LimitParams>,
) -> Result<Json<Vec<Record>>, ApiFailure> {
    serve_recent(state, params, UTILITIES).await
}

/// GET /api/data/combined
pub async fn combined(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<CombinedPlantData>, ApiFailure> {
    let request_id = state.ids.next_id();

    combined_plant_data(&state)
        .await
        .map(Json)
        .map_err(|e| e.with_request_id(&request_id))
}

async fn serve_recent(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<LimitParams>,
    reads: RecentReads,
) -> Result<Json<Vec<Record>>, ApiFailure> {
    let request_id = state.ids.next_id();

    let rows = recent_rows(&state, params.limit.as_deref(), reads)
        .await
        .map_err(|e| e.with_request_id(&request_id))?;

    debug!(request_id = %request_id, stream = %reads.stream, count = rows.len(), "Recent rows served");
    Ok(Json(rows))
}

/// Most recent rows of `reads.stream`; a missing limit takes the stream's default
pub(crate) async fn recent_rows(
    state: &AppState,
    limit: Option<&str>,
    reads: RecentReads,
) -> Result<Vec<Record>, ApiError> {
    let limit = match limit {
        Some(raw) => validate_limit(raw, reads.max_limit)?,
        None => reads.default_limit,
    };

    Ok(state.orchestrator.recent_readings(reads.stream, limit).await?)
}

pub(crate) async fn combined_plant_data(state: &AppState) -> Result<CombinedPlantData, ApiError> {
    Ok(CombinedPlantData {
        plant_overview: state.orchestrator.overview_summary().await?,
        raw_material: recent_rows(state, None, RAW_MATERIAL).await?,
        grinding: recent_rows(state, None, GRINDING).await?,
        kiln: recent_rows(state, None, KILN).await?,
        quality: recent_rows(state, None, QUALITY).await?,
        alternative_fuels: recent_rows(state, None, ALTERNATIVE_FUELS).await?,
        utilities: recent_rows(state, None, UTILITIES).await?,
        timestamp: state.orchestrator.now_rfc3339(),
    })
}
