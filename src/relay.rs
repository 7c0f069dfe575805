//! The relay context shared by the ingest and subscriber listeners.
//!
//! ```text
//!  producer ── POST ──► ingest ──► StateStore::merge_with ─► BroadcastHub::broadcast
//!                                                              │
//!  display ─── WS ────► connect ─► Bootstrapper (if unset)     ▼
//!                          └─────► register + push_one    per-display queues
//! ```

use crate::server::hub::{BroadcastHub, Outbox, SubscriberId};
use crate::store::{AutopilotState, PartialAutopilotState, StateStore};
use crate::telemetry::Bootstrapper;

/// Owns the state of record, the subscriber registry and the bootstrapper.
pub struct Relay {
    store: StateStore,
    hub: BroadcastHub,
    bootstrapper: Bootstrapper,
}

impl Relay {
    pub fn new(bootstrapper: Bootstrapper) -> Self {
        Self {
            store: StateStore::new(),
            hub: BroadcastHub::new(),
            bootstrapper,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Merges a producer update and fans the result out to every display.
    ///
    /// The broadcast is queued under the store's write lock, so every display
    /// receives commits in version order and none is skipped. An update
    /// naming no known field is dropped without a broadcast. Per-display
    /// delivery failures only prune that display.
    pub fn ingest(&self, partial: &PartialAutopilotState) -> AutopilotState {
        let (snapshot, report) = self
            .store
            .merge_with(partial, |snapshot| self.hub.broadcast(snapshot));

        let Some(report) = report else {
            tracing::debug!("Update named no known field, nothing committed");
            return snapshot.state;
        };

        tracing::info!(
            version = snapshot.version,
            mode = %snapshot.state.mode,
            delivered = report.delivered,
            dropped = report.dropped,
            "Autopilot state updated"
        );

        snapshot.state
    }

    /// Registers a display and queues its first snapshot.
    ///
    /// Bootstraps from the telemetry API first if nothing has been committed
    /// yet; otherwise the current state is sent as is. A bootstrap that
    /// lands is also broadcast to displays already connected on the default.
    pub async fn connect(&self, tx: Outbox) -> SubscriberId {
        if !self.store.is_initialized() {
            self.bootstrapper
                .fetch_initial(&self.store, |snapshot| {
                    self.hub.broadcast(snapshot);
                })
                .await;
        }

        let id = self.hub.register(tx);
        // A broadcast racing in after register carries a newer version and
        // wins; the hub drops this one as stale.
        self.hub.push_one(id, &self.store.snapshot());
        id
    }

    pub fn disconnect(&self, id: SubscriberId) {
        self.hub.unregister(id);
    }
}
