//! autorelay - autopilot state relay
//!
//! Keeps one authoritative autopilot state (selected mode plus altitude,
//! vertical speed, heading, course and airspeed targets), merges partial
//! updates POSTed by the simulator bridge, seeds itself from the
//! simulator's telemetry API, and pushes every committed state to all
//! connected WebSocket displays.

pub mod config;
pub mod relay;
pub mod server;
pub mod store;
pub mod telemetry;

pub use relay::Relay;
