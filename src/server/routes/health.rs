//! Health endpoint.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::relay::Relay;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Connected displays.
    pub subscribers: usize,
    /// Whether a bootstrap or producer update has landed.
    pub initialized: bool,
    pub version: u64,
    /// RFC 3339 time of the last committed update.
    pub last_update: Option<String>,
}

/// GET /health - Liveness plus relay status.
pub async fn health_check(State(relay): State<Arc<Relay>>) -> Json<HealthResponse> {
    let store = relay.store();
    Json(HealthResponse {
        status: "ok",
        subscribers: relay.hub().subscriber_count(),
        initialized: store.is_initialized(),
        version: store.snapshot().version,
        last_update: store.last_updated().map(|t| t.to_rfc3339()),
    })
}
