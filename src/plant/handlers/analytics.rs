use axum::extract::Extension;
use axum::Json;
use std::sync::Arc;
use tracing::info;

use cement_plant::KpiReport;

use super::AppState;
use crate::error::{ApiError, ApiFailure};

/// GET /api/analytics/plant-report
pub async fn plant_report(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<KpiReport>, ApiFailure> {
    let request_id = state.ids.next_id();

    let report = state
        .orchestrator
        .generate_report()
        .await
        .map_err(|e| ApiError::from(e).with_request_id(&request_id))?;

    info!(
        request_id = %request_id,
        score = report.plant_efficiency_score,
        recommendations = report.recommendations.len(),
        "Plant report generated"
    );
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support;
    use cement_plant::shared::domain::streams;
    use cement_plant::test_utils::helpers::record;
    use cement_plant::Store;
    use serde_json::json;

    #[tokio::test]
    async fn test_report_over_empty_store_uses_defaults() {
        let (state, _store) = test_support::state();

        let Json(report) = plant_report(Extension(state)).await.unwrap();

        assert!(report.plant_efficiency_score >= 55.0);
        assert!(report.plant_efficiency_score <= 100.0);
    }

    #[tokio::test]
    async fn test_report_reflects_latest_grinding() {
        let (state, store) = test_support::state();
        store
            .insert(
                streams::GRINDING_OPERATIONS,
                record(json!({"power_consumption_kw": 2800.0, "total_feed_rate_tph": 80.0})),
            )
            .await
            .unwrap();

        let Json(report) = plant_report(Extension(state)).await.unwrap();

        assert_eq!(report.energy.specific_energy_consumption.value, Some(35.0));
        assert!(!report.recommendations.is_empty());
    }
}
