use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::dispatch::EventDispatcher;
use crate::presence::{PresenceConfig, PresenceTracker};
use crate::registry::RoomRegistry;

/// Shared application state containing all hub components
///
/// Everything is explicitly constructed and dependency-injected; tests can
/// build as many isolated hubs as they need.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
    pub presence: Arc<PresenceTracker>,
    pub dispatcher: Arc<EventDispatcher>,
}

impl AppState {
    pub fn new(
        registry: Arc<RoomRegistry>,
        presence: Arc<PresenceTracker>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            registry,
            presence,
            dispatcher,
        }
    }

    /// Wires a hub with default capacities and windows
    pub fn with_defaults() -> Self {
        let registry = Arc::new(RoomRegistry::new());
        let presence = Arc::new(PresenceTracker::new(PresenceConfig::default()));
        let dispatcher = Arc::new(EventDispatcher::new(registry.clone(), presence.clone()));
        Self::new(registry, presence, dispatcher)
    }
}

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Invalid room: {0}")]
    InvalidRoom(String),

    #[error("Publish rejected: {0}")]
    PublishRejected(String),

    #[error("Transport broken: {0}")]
    TransportBroken(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            HubError::InvalidRoom(msg) => (StatusCode::BAD_REQUEST, msg),
            HubError::PublishRejected(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            HubError::TransportBroken(msg) => (StatusCode::BAD_GATEWAY, msg),
            HubError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            HubError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "ok": false,
            "error": error_message
        }));

        (status, body).into_response()
    }
}
