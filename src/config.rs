use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::telemetry::DEFAULT_API_URL;

/// autorelay: flight-sim autopilot state → WebSocket displays
#[derive(Parser, Debug, Clone)]
#[command(name = "autorelay", version)]
pub struct Config {
    /// Listen address for producer updates (POST /autopilot/update)
    #[arg(long, env = "AUTORELAY_HTTP_ADDR", default_value = "0.0.0.0:8080")]
    pub http_addr: SocketAddr,

    /// Listen address for display WebSocket connections
    #[arg(long, env = "AUTORELAY_WS_ADDR", default_value = "0.0.0.0:8081")]
    pub ws_addr: SocketAddr,

    /// Telemetry API endpoint queried on bootstrap
    #[arg(long, env = "API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Upstream request timeout in milliseconds
    #[arg(long, env = "AUTORELAY_UPSTREAM_TIMEOUT_MS", default_value_t = 2000)]
    pub upstream_timeout_ms: u64,
}

impl Config {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let config = Config::try_parse_from([
            "autorelay",
            "--http-addr",
            "127.0.0.1:9000",
            "--ws-addr",
            "127.0.0.1:9001",
            "--api-url",
            "http://sim.local:43380/webapi",
            "--upstream-timeout-ms",
            "750",
        ])
        .unwrap();

        assert_eq!(config.http_addr.port(), 9000);
        assert_eq!(config.ws_addr.port(), 9001);
        assert_eq!(config.api_url, "http://sim.local:43380/webapi");
        assert_eq!(config.upstream_timeout(), Duration::from_millis(750));
    }

    #[test]
    fn test_rejects_bad_address() {
        assert!(Config::try_parse_from(["autorelay", "--http-addr", "not-an-addr"]).is_err());
    }
}
