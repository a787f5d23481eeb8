//! Live subscriber connections and best-effort fan-out.

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::id_generator::{IdGenerator, RandomIdGenerator};
use crate::plant_insights::PriorityLevel;
use crate::time::{Clock, SystemClock};

pub type ConnectionId = String;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("subscriber buffer is full")]
    Full,

    #[error("subscriber disconnected")]
    Closed,

    #[error("transport error: {0}")]
    Other(String),
}

/// Transport-side handle of one live connection
#[async_trait]
pub trait Subscriber: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), TransportError>;
}

/// Subscriber backed by a bounded channel drained by the socket task.
///
/// Never waits for room: a full buffer is a failed send.
#[derive(Debug, Clone)]
pub struct ChannelSubscriber {
    tx: mpsc::Sender<String>,
}

impl ChannelSubscriber {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Subscriber for ChannelSubscriber {
    async fn send(&self, message: &str) -> Result<(), TransportError> {
        self.tx.try_send(message.to_string()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::Full,
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    PlantData,
    Alerts,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::PlantData => "plant_data",
            Topic::Alerts => "alerts",
        }
    }
}

/// What a client asked for when it connected
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub topic: Topic,
    pub priority_filter: Option<PriorityLevel>,
    pub client_id: Option<String>,
}

impl Subscription {
    pub fn new(topic: Topic) -> Self {
        Self {
            topic,
            priority_filter: None,
            client_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionMetadata {
    pub id: ConnectionId,
    pub topic: Topic,
    pub connected_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_filter: Option<PriorityLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// Result of one broadcast sweep
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BroadcastOutcome {
    pub delivered: usize,
    pub removed: Vec<ConnectionId>,
}

struct Connection {
    handle: Arc<dyn Subscriber>,
    metadata: ConnectionMetadata,
}

/// Owns the set of live connections.
///
/// The lock is held only to read or mutate the map, never across a send, so a
/// slow transport cannot stall registration or other broadcasts.
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, Connection>>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::with_sources(Arc::new(RandomIdGenerator::new()), Arc::new(SystemClock::new()))
    }

    pub fn with_sources(ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            ids,
            clock,
        }
    }

    pub async fn register(
        &self,
        handle: Arc<dyn Subscriber>,
        subscription: Subscription,
    ) -> ConnectionMetadata {
        let metadata = ConnectionMetadata {
            id: self.ids.next_id(),
            topic: subscription.topic,
            connected_at: self.clock.now_rfc3339(),
            priority_filter: subscription.priority_filter,
            client_id: subscription.client_id,
        };

        let total = {
            let mut connections = self.connections.lock().await;
            connections.insert(
                metadata.id.clone(),
                Connection {
                    handle,
                    metadata: metadata.clone(),
                },
            );
            connections.len()
        };

        info!(
            connection_id = %metadata.id,
            topic = metadata.topic.as_str(),
            total,
            "Subscriber connected"
        );
        metadata
    }

    /// Idempotent; returns whether the connection was still registered
    pub async fn unregister(&self, id: &str) -> bool {
        let (removed, total) = {
            let mut connections = self.connections.lock().await;
            let removed = connections.remove(id).is_some();
            (removed, connections.len())
        };

        if removed {
            info!(connection_id = %id, total, "Subscriber disconnected");
        }
        removed
    }

    /// Send to one connection. A transport error unregisters it and is
    /// swallowed; returns whether the message was handed to the transport.
    pub async fn send_one(&self, id: &str, message: &str) -> bool {
        let handle = {
            let connections = self.connections.lock().await;
            match connections.get(id) {
                Some(connection) => connection.handle.clone(),
                None => return false,
            }
        };

        match handle.send(message).await {
            Ok(()) => true,
            Err(e) => {
                warn!(connection_id = %id, error = %e, "Send failed, dropping subscriber");
                self.unregister(id).await;
                false
            }
        }
    }

    /// Send to every registered connection. Failed connections are removed
    /// after the sweep; the others are unaffected.
    pub async fn broadcast(&self, message: &str) -> BroadcastOutcome {
        let targets: Vec<(ConnectionId, Arc<dyn Subscriber>)> = {
            let connections = self.connections.lock().await;
            connections
                .iter()
                .map(|(id, connection)| (id.clone(), connection.handle.clone()))
                .collect()
        };

        if targets.is_empty() {
            return BroadcastOutcome::default();
        }

        let results = join_all(targets.iter().map(|(id, handle)| async move {
            let result = handle.send(message).await;
            (id, result)
        }))
        .await;

        let mut outcome = BroadcastOutcome::default();
        for (id, result) in results {
            match result {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    warn!(connection_id = %id, error = %e, "Broadcast send failed");
                    outcome.removed.push(id.clone());
                }
            }
        }

        if !outcome.removed.is_empty() {
            let mut connections = self.connections.lock().await;
            for id in &outcome.removed {
                connections.remove(id);
            }
        }

        debug!(
            delivered = outcome.delivered,
            removed = outcome.removed.len(),
            "Broadcast complete"
        );
        outcome
    }

    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.connections.lock().await.contains_key(id)
    }

    /// Metadata of every live connection, oldest first
    pub async fn connections(&self) -> Vec<ConnectionMetadata> {
        let mut all: Vec<ConnectionMetadata> = self
            .connections
            .lock()
            .await
            .values()
            .map(|connection| connection.metadata.clone())
            .collect();
        all.sort_by(|a, b| a.connected_at.cmp(&b.connected_at).then(a.id.cmp(&b.id)));
        all
    }
}
