//! WebSocket endpoints: one task per socket forwards registry messages from
//! the connection's bounded channel and unregisters when the peer leaves.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Extension, Query};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use cement_plant::{validate_client_id, validate_priority_filter, ChannelSubscriber, Subscription, Topic};

use super::AppState;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct PlantDataParams {
    pub client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertParams {
    pub priority_filter: Option<String>,
}

/// GET /ws/plant-data
pub async fn plant_data(
    ws: WebSocketUpgrade,
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<PlantDataParams>,
) -> Response {
    match plant_data_subscription(params) {
        Ok(subscription) => ws
            .on_upgrade(move |socket| serve_socket(socket, state, subscription))
            .into_response(),
        Err(err) => err.with_request_id(&state.ids.next_id()).into_response(),
    }
}

/// GET /ws/alerts
pub async fn alerts(
    ws: WebSocketUpgrade,
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<AlertParams>,
) -> Response {
    match alerts_subscription(params) {
        Ok(subscription) => ws
            .on_upgrade(move |socket| serve_socket(socket, state, subscription))
            .into_response(),
        Err(err) => err.with_request_id(&state.ids.next_id()).into_response(),
    }
}

/// GET /ws/status
pub async fn status(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(connection_status(&state).await)
}

pub(crate) fn plant_data_subscription(params: PlantDataParams) -> Result<Subscription, ApiError> {
    let mut subscription = Subscription::new(Topic::PlantData);
    if let Some(client_id) = params.client_id {
        validate_client_id(&client_id)?;
        subscription.client_id = Some(client_id);
    }
    Ok(subscription)
}

pub(crate) fn alerts_subscription(params: AlertParams) -> Result<Subscription, ApiError> {
    let mut subscription = Subscription::new(Topic::Alerts);
    if let Some(raw) = params.priority_filter {
        subscription.priority_filter = Some(validate_priority_filter(&raw)?);
    }
    Ok(subscription)
}

pub(crate) async fn connection_status(state: &AppState) -> Value {
    let connections = state.registry.connections().await;
    json!({
        "active_connections": connections.len(),
        "connections": connections,
    })
}

/// Register the socket, send its greeting, then pump until either side closes
async fn serve_socket(mut socket: WebSocket, state: Arc<AppState>, subscription: Subscription) {
    let (subscriber, mut outbound) = ChannelSubscriber::channel(state.subscriber_buffer);
    let topic = subscription.topic;
    let priority_filter = subscription.priority_filter;
    let metadata = state.registry.register(Arc::new(subscriber), subscription).await;
    let connection_id = metadata.id;

    info!(connection_id = %connection_id, topic = %topic.as_str(), "WebSocket connected");

    let greeting = match topic {
        Topic::PlantData => state.orchestrator.initial_message().await,
        Topic::Alerts => state.orchestrator.welcome_message(priority_filter),
    };
    match greeting {
        Ok(message) => {
            state.registry.send_one(&connection_id, &message).await;
        }
        Err(e) => warn!(
            connection_id = %connection_id,
            error = %format!("{:#}", e),
            "Failed to build greeting"
        ),
    }

    loop {
        tokio::select! {
            outgoing = outbound.recv() => match outgoing {
                Some(text) => {
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                // The registry dropped this connection after a failed send
                None => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => debug!(connection_id = %connection_id, "Ignoring inbound frame"),
            },
        }
    }

    state.registry.unregister(&connection_id).await;
    info!(connection_id = %connection_id, "WebSocket disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support;
    use axum::http::StatusCode;
    use cement_plant::shared::error::error_codes;
    use cement_plant::test_utils::doubles::RecordingSubscriber;
    use cement_plant::PriorityLevel;

    #[test]
    fn test_alerts_subscription_parses_filter() {
        let subscription = alerts_subscription(AlertParams {
            priority_filter: Some("2".to_string()),
        })
        .unwrap();

        assert_eq!(subscription.topic, Topic::Alerts);
        assert_eq!(subscription.priority_filter, Some(PriorityLevel::HIGH));
    }

    #[test]
    fn test_alerts_subscription_rejects_out_of_range() {
        for raw in ["0", "6", "urgent"] {
            let err = alerts_subscription(AlertParams {
                priority_filter: Some(raw.to_string()),
            })
            .unwrap_err();
            let failure = err.with_request_id("req-1");
            assert_eq!(failure.status, StatusCode::BAD_REQUEST);
            assert_eq!(failure.body.error, error_codes::INVALID_PRIORITY_FILTER);
        }
    }

    #[test]
    fn test_plant_data_subscription() {
        let subscription = plant_data_subscription(PlantDataParams::default()).unwrap();
        assert_eq!(subscription.topic, Topic::PlantData);
        assert_eq!(subscription.client_id, None);

        let subscription = plant_data_subscription(PlantDataParams {
            client_id: Some("hmi-1".to_string()),
        })
        .unwrap();
        assert_eq!(subscription.client_id.as_deref(), Some("hmi-1"));

        assert!(plant_data_subscription(PlantDataParams {
            client_id: Some("bad id".to_string()),
        })
        .is_err());
    }

    #[tokio::test]
    async fn test_connection_status_lists_live_connections() {
        let (state, _store) = test_support::state();
        let empty = connection_status(&state).await;
        assert_eq!(empty["active_connections"], 0);

        let mut subscription = Subscription::new(Topic::Alerts);
        subscription.priority_filter = Some(PriorityLevel::CRITICAL);
        state
            .registry
            .register(RecordingSubscriber::new(), subscription)
            .await;
        state
            .registry
            .register(RecordingSubscriber::new(), Subscription::new(Topic::PlantData))
            .await;

        let status = connection_status(&state).await;
        assert_eq!(status["active_connections"], 2);
        assert_eq!(status["connections"].as_array().unwrap().len(), 2);
    }
}
