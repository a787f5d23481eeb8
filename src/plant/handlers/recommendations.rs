use axum::extract::{Extension, Path};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use cement_plant::validate_alert_id;

use super::AppState;
use crate::error::{ApiError, ApiFailure};

/// POST /api/recommendations/:id/acknowledge
pub async fn acknowledge(
    Extension(state): Extension<Arc<AppState>>,
    Path(alert_id): Path<String>,
) -> Result<Json<Value>, ApiFailure> {
    let request_id = state.ids.next_id();
    info!(request_id = %request_id, alert_id = %alert_id, "Acknowledge alert requested");

    acknowledge_alert(&state, &alert_id)
        .await
        .map(Json)
        .map_err(|e| e.with_request_id(&request_id))
}

/// Flip `action_taken` on an open alert. An alert that is already
/// acknowledged, or was never stored, is reported as not found.
pub(crate) async fn acknowledge_alert(state: &AppState, alert_id: &str) -> Result<Value, ApiError> {
    validate_alert_id(alert_id)?;

    let affected = state.orchestrator.acknowledge_alert(alert_id).await?;
    if affected == 0 {
        return Err(ApiError::AlertNotFound(alert_id.to_string()));
    }

    Ok(json!({
        "message": "Recommendation marked as acted upon",
        "id": alert_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support;
    use cement_plant::shared::domain::streams;
    use cement_plant::test_utils::helpers::record;
    use cement_plant::Store;

    #[tokio::test]
    async fn test_acknowledge_is_one_way() {
        let (state, store) = test_support::state();
        store
            .insert(
                streams::AI_RECOMMENDATIONS,
                record(json!({"id": "alert-1", "priority_level": 1, "action_taken": false})),
            )
            .await
            .unwrap();

        let body = acknowledge_alert(&state, "alert-1").await.unwrap();
        assert_eq!(body["id"], "alert-1");

        let stored = store
            .get_latest(streams::AI_RECOMMENDATIONS)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["action_taken"], true);

        // Second acknowledgment finds nothing left to flip
        let err = acknowledge_alert(&state, "alert-1").await.unwrap_err();
        assert!(matches!(err, ApiError::AlertNotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_and_invalid_ids() {
        let (state, _store) = test_support::state();

        let err = acknowledge_alert(&state, "missing").await.unwrap_err();
        assert!(matches!(err, ApiError::AlertNotFound(_)));

        let err = acknowledge_alert(&state, "bad id!").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_handler_renders_not_found() {
        let (state, _store) = test_support::state();

        let failure = acknowledge(Extension(state), Path("nope".to_string()))
            .await
            .unwrap_err();

        assert_eq!(failure.status, axum::http::StatusCode::NOT_FOUND);
        assert_eq!(failure.body.request_id, "req-1");
    }
}
