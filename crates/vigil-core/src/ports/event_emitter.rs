//! Event emitter trait for gateway events.
//!
//! Components publish [`GatewayEvent`]s through this port. Implementations
//! handle transport details (broadcast channels, SSE, test collectors).

use std::sync::Mutex;

use crate::events::GatewayEvent;

/// Trait for emitting gateway events.
///
/// `emit` must not block: it is called from the request path.
pub trait GatewayEventEmitter: Send + Sync {
    fn emit(&self, event: GatewayEvent);
}

/// A no-op event emitter for tests and contexts without listeners.
#[derive(Debug, Clone, Default)]
pub struct NoopEmitter;

impl NoopEmitter {
    /// Create a new no-op emitter.
    pub const fn new() -> Self {
        Self
    }
}

impl GatewayEventEmitter for NoopEmitter {
    fn emit(&self, _event: GatewayEvent) {}
}

/// Emitter that keeps every event in memory. Intended for tests.
#[derive(Debug, Default)]
pub struct CollectingEmitter {
    events: Mutex<Vec<GatewayEvent>>,
}

impl CollectingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events emitted so far.
    pub fn events(&self) -> Vec<GatewayEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl GatewayEventEmitter for CollectingEmitter {
    fn emit(&self, event: GatewayEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
