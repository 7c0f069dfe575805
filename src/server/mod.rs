//! HTTP server module for the ingest and display listeners.
//!
//! Two listeners share one [`Relay`]: producers POST updates to the ingest
//! listener, displays hold WebSocket connections on the subscriber listener.

pub mod hub;
pub mod routes;
pub mod ws;

use crate::config::Config;
use crate::relay::Relay;
use crate::server::routes::{autopilot, health};
use crate::server::ws::ws_handler;

use axum::{
    routing::{get, post},
    Router,
};
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Router for producers.
pub fn ingest_router(relay: Arc<Relay>) -> Router {
    // CORS layer for browser-based producers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/autopilot/update", post(autopilot::post_update))
        .route("/autopilot/state", get(autopilot::get_state))
        .layer(cors)
        .with_state(relay)
}

/// Router for displays.
pub fn subscriber_router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .with_state(relay)
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

async fn wait_for_stop(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Serves both routers on already-bound listeners until `shutdown` resolves.
pub async fn serve(
    http_listener: TcpListener,
    ws_listener: TcpListener,
    relay: Arc<Relay>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown.await;
        let _ = stop_tx.send(true);
    });

    let http = axum::serve(http_listener, ingest_router(Arc::clone(&relay)))
        .with_graceful_shutdown(wait_for_stop(stop_rx.clone()))
        .into_future();
    let ws = axum::serve(ws_listener, subscriber_router(relay))
        .with_graceful_shutdown(wait_for_stop(stop_rx))
        .into_future();

    tokio::try_join!(http, ws)?;
    Ok(())
}

/// Binds the configured addresses and serves until `shutdown` resolves.
pub async fn run(
    config: &Config,
    relay: Arc<Relay>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let http_listener = bind(config.http_addr).await?;
    let ws_listener = bind(config.ws_addr).await?;

    tracing::info!(addr = %config.http_addr, "Ingest listener ready");
    tracing::info!(addr = %config.ws_addr, "Display listener ready");

    serve(http_listener, ws_listener, relay, shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{Bootstrapper, TelemetryClient, DEFAULT_TIMEOUT};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use futures::StreamExt;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio_tungstenite::{connect_async, tungstenite};
    use tower::ServiceExt;

    fn test_relay() -> Arc<Relay> {
        let client = TelemetryClient::new("http://127.0.0.1:1/webapi", DEFAULT_TIMEOUT).unwrap();
        Arc::new(Relay::new(Bootstrapper::new(client)))
    }

    fn post_json(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/autopilot/update")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let relay = test_relay();
        let app = ingest_router(Arc::clone(&relay));

        let response = app
            .oneshot(post_json(r#"{"mode":"ALT","altitude":3500,"flaps":2}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let state = relay.store().get();
        assert_eq!(state.altitude, 3500.0);
        assert_eq!(state.mode, crate::store::Mode::Alt);
    }

    #[tokio::test]
    async fn test_update_rejects_unparsable_body() {
        let relay = test_relay();
        let app = ingest_router(Arc::clone(&relay));

        let response = app.oneshot(post_json("{not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!relay.store().is_initialized());
    }

    #[tokio::test]
    async fn test_update_accepts_non_object_and_empty_body() {
        let relay = test_relay();

        for body in ["[1,2,3]", "", "42"] {
            let response = ingest_router(Arc::clone(&relay))
                .oneshot(post_json(body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "body {body:?}");
        }
        assert_eq!(relay.store().get(), crate::store::AutopilotState::default());
        assert!(!relay.store().is_initialized());
        assert_eq!(relay.store().snapshot().version, 0);
    }

    #[tokio::test]
    async fn test_get_state_and_health() {
        let relay = test_relay();
        ingest_router(Arc::clone(&relay))
            .oneshot(post_json(r#"{"heading":90}"#))
            .await
            .unwrap();

        let response = ingest_router(Arc::clone(&relay))
            .oneshot(Request::builder().uri("/autopilot/state").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let state = body_json(response).await;
        assert_eq!(state["heading"], 90.0);
        assert!(state["mode"].is_null());

        let response = ingest_router(relay)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let health = body_json(response).await;
        assert_eq!(health["status"], "ok");
        assert_eq!(health["initialized"], true);
        assert_eq!(health["version"], 1);
        assert_eq!(health["subscribers"], 0);
        assert!(health["last_update"].is_string());
    }

    async fn spawn_servers(relay: Arc<Relay>) -> (SocketAddr, SocketAddr) {
        let http = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ws = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addrs = (http.local_addr().unwrap(), ws.local_addr().unwrap());
        tokio::spawn(serve(http, ws, relay, std::future::pending()));
        addrs
    }

    async fn next_json<S>(stream: &mut S) -> Value
    where
        S: futures::Stream<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
    {
        let msg = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for message")
            .expect("stream ended")
            .expect("websocket error");
        serde_json::from_str(msg.to_text().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_update_reaches_displays() {
        let relay = test_relay();
        let (http_addr, ws_addr) = spawn_servers(Arc::clone(&relay)).await;

        let (mut display_a, _) = connect_async(format!("ws://{ws_addr}/")).await.unwrap();
        let (mut display_b, _) = connect_async(format!("ws://{ws_addr}/ws")).await.unwrap();

        // Upstream is unreachable, so both start from the default state
        assert!(next_json(&mut display_a).await["mode"].is_null());
        assert!(next_json(&mut display_b).await["mode"].is_null());

        let response = reqwest::Client::new()
            .post(format!("http://{http_addr}/autopilot/update"))
            .json(&json!({ "mode": "ALT", "altitude": 3500 }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        assert_eq!(response.text().await.unwrap(), autopilot::UPDATE_ACK);

        let expected = json!({
            "mode": "ALT",
            "altitude": 3500.0,
            "vertical_speed": 0.0,
            "heading": 0.0,
            "crs": 0.0,
            "ias": 0.0,
        });
        assert_eq!(next_json(&mut display_a).await, expected);
        assert_eq!(next_json(&mut display_b).await, expected);
    }

    #[tokio::test]
    async fn test_closed_display_is_unregistered() {
        let relay = test_relay();
        let (_http_addr, ws_addr) = spawn_servers(Arc::clone(&relay)).await;

        let (mut display, _) = connect_async(format!("ws://{ws_addr}/")).await.unwrap();
        next_json(&mut display).await;
        assert_eq!(relay.hub().subscriber_count(), 1);

        display.close(None).await.unwrap();

        for _ in 0..50 {
            if relay.hub().subscriber_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(relay.hub().subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_run_reports_bind_failure() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();
        let config = Config {
            http_addr: addr,
            ws_addr: "127.0.0.1:0".parse().unwrap(),
            api_url: "http://127.0.0.1:1/webapi".to_string(),
            upstream_timeout_ms: 100,
        };

        let err = run(&config, test_relay(), async {}).await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { addr: a, .. } if a == addr));
    }
}
