//! Producer ingest and state read endpoints.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde_json::Value;
use std::sync::Arc;

use crate::relay::Relay;
use crate::store::{AutopilotState, PartialAutopilotState};

/// Acknowledgment body for a committed update.
pub const UPDATE_ACK: &str = "Autopilot state received and updated";

/// POST /autopilot/update - Merge a partial state and push it to displays.
///
/// The body is any JSON value; only an object contributes fields, and
/// unknown or mistyped keys are ignored. An empty body counts as `{}`.
/// Only bytes that are not JSON at all are rejected.
pub async fn post_update(
    State(relay): State<Arc<Relay>>,
    body: Bytes,
) -> Result<&'static str, (StatusCode, String)> {
    let value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&body).map_err(|e| {
            tracing::warn!(error = %e, "Rejecting unparsable producer payload");
            (StatusCode::BAD_REQUEST, format!("invalid JSON body: {e}"))
        })?
    };

    let partial = PartialAutopilotState::from_value(&value);
    if partial.is_empty() {
        tracing::debug!("Producer update named no known fields");
    }
    relay.ingest(&partial);

    Ok(UPDATE_ACK)
}

/// GET /autopilot/state - Current state, as displays receive it.
pub async fn get_state(State(relay): State<Arc<Relay>>) -> Json<AutopilotState> {
    Json(relay.store().get())
}
