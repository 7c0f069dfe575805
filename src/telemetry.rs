//! Upstream flight-simulation telemetry API.
//!
//! The simulator bridge exposes a single `getvars` endpoint: POST a list of
//! named variables, get back their current values in the same order. This
//! module queries the six variables the relay cares about and turns them
//! into an [`AutopilotState`].

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::store::{map_mode, AutopilotState, Snapshot, StateStore};

/// Default telemetry API endpoint.
pub const DEFAULT_API_URL: &str = "http://localhost:43380/webapi";

/// Default upper bound on a single upstream round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Variables queried on bootstrap, in the order their values map onto
/// mode, altitude, vertical speed, heading, course and airspeed.
pub const BOOTSTRAP_VARS: [&str; 6] = [
    "(L:SELECTED_BUG_MODE)",
    "(A:AUTOPILOT ALTITUDE LOCK VAR, feet)",
    "(A:AUTOPILOT VERTICAL HOLD VAR:0, Feet per minute)",
    "(A:AUTOPILOT HEADING LOCK DIR, degrees)",
    "(A:NAV1 OBS, degrees)",
    "(A:AUTOPILOT AIRSPEED HOLD VAR:0, Knots)",
];

/// Errors from the telemetry API.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("telemetry API timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("telemetry API unreachable: {0}")]
    Connection(String),

    #[error("telemetry API returned HTTP {0}")]
    Status(u16),

    #[error("telemetry API returned unexpected response: {0}")]
    Malformed(String),
}

#[derive(Serialize)]
struct VarQuery<'a> {
    var: &'a str,
    value: f64,
}

#[derive(Serialize)]
struct GetVarsRequest<'a> {
    getvars: Vec<VarQuery<'a>>,
}

#[derive(Deserialize)]
struct GetVarsResponse {
    getvars: Vec<VarReading>,
}

#[derive(Deserialize)]
struct VarReading {
    value: f64,
}

/// Converts the ordered bootstrap values into a state.
pub fn state_from_values(values: &[f64]) -> Result<AutopilotState, TelemetryError> {
    let Some([code, altitude, vertical_speed, heading, crs, ias]) =
        values.get(..BOOTSTRAP_VARS.len())
    else {
        return Err(TelemetryError::Malformed(format!(
            "expected {} values, got {}",
            BOOTSTRAP_VARS.len(),
            values.len()
        )));
    };

    Ok(AutopilotState {
        mode: map_mode(*code),
        altitude: *altitude,
        vertical_speed: *vertical_speed,
        heading: *heading,
        crs: *crs,
        ias: *ias,
    })
}

/// HTTP client for the telemetry API.
pub struct TelemetryClient {
    http: Client,
    api_url: String,
    timeout: Duration,
}

impl TelemetryClient {
    /// Creates a client whose every request is bounded by `timeout`.
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, TelemetryError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TelemetryError::Client)?;

        Ok(Self {
            http,
            api_url: api_url.into(),
            timeout,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn map_transport_error(&self, e: reqwest::Error) -> TelemetryError {
        if e.is_timeout() {
            TelemetryError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else if e.is_decode() {
            TelemetryError::Malformed(e.to_string())
        } else {
            TelemetryError::Connection(e.to_string())
        }
    }

    /// Queries the bootstrap variables and maps them into a state.
    pub async fn fetch_state(&self) -> Result<AutopilotState, TelemetryError> {
        let body = GetVarsRequest {
            getvars: BOOTSTRAP_VARS
                .iter()
                .map(|&var| VarQuery { var, value: 0.0 })
                .collect(),
        };

        tracing::debug!(url = %self.api_url, "Querying telemetry API");

        let resp = self
            .http
            .post(&self.api_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TelemetryError::Status(status.as_u16()));
        }

        let parsed: GetVarsResponse = resp
            .json()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let values: Vec<f64> = parsed.getvars.iter().map(|r| r.value).collect();
        state_from_values(&values)
    }
}

impl std::fmt::Debug for TelemetryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryClient")
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Seeds the store from the telemetry API.
#[derive(Debug)]
pub struct Bootstrapper {
    client: TelemetryClient,
}

impl Bootstrapper {
    pub fn new(client: TelemetryClient) -> Self {
        Self { client }
    }

    /// Fetches initial values and applies them if the store is still unset.
    ///
    /// Never fails: on any upstream error the store is left untouched and its
    /// current value is returned. No store lock is held during the fetch;
    /// `on_apply` runs under the store's write lock only if the candidate
    /// was applied.
    pub async fn fetch_initial(
        &self,
        store: &StateStore,
        on_apply: impl FnOnce(&Snapshot),
    ) -> AutopilotState {
        match self.client.fetch_state().await {
            Ok(candidate) => {
                if store.apply_bootstrap_with(candidate, on_apply).is_some() {
                    tracing::info!(
                        mode = %candidate.mode,
                        altitude = candidate.altitude,
                        vertical_speed = candidate.vertical_speed,
                        heading = candidate.heading,
                        crs = candidate.crs,
                        ias = candidate.ias,
                        "Initial autopilot state fetched"
                    );
                } else {
                    tracing::debug!("Store already initialized, discarding bootstrap result");
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    url = %self.client.api_url(),
                    "Failed to fetch initial autopilot state"
                );
            }
        }
        store.get()
    }
}
