//! State storage module.
//!
//! Provides the autopilot state types, the mode mapper, and the
//! thread-safe store that owns the single state of record.

pub mod mode;
pub mod state_store;
pub mod types;

pub use mode::*;
pub use state_store::*;
pub use types::*;
