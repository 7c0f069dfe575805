//! Route handlers module.

pub mod autopilot;
pub mod health;
