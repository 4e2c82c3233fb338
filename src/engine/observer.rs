//! Notifications from the engine to the host screen.
//!
//! Called on the thread that drives the engine. Implementations are shared
//! with the FFI layer, so they must be `Send + Sync`.

use std::sync::Mutex;

/// Something the host may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The map finished its initial load; fired once per engine
    MapLoaded,
    /// Availability state changed, e.g. `awaiting_position` to `tracking`
    StateChanged {
        from: &'static str,
        to: &'static str,
    },
}

/// Receiver for engine notifications.
pub trait EngineObserver: Send + Sync {
    /// The map surface finished loading; drive the spinner-to-content switch.
    fn on_map_loaded(&self);
    /// Availability state moved from one state to another.
    fn on_state_changed(&self, from: &'static str, to: &'static str);
}

/// No-op implementation used when the host does not listen.
pub struct NoopObserver;

impl EngineObserver for NoopObserver {
    fn on_map_loaded(&self) {}
    fn on_state_changed(&self, _from: &'static str, _to: &'static str) {}
}

/// Observer that records every event; useful for tests and debugging.
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Mutex<Vec<EngineEvent>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events, oldest first.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn push(&self, event: EngineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl EngineObserver for EventRecorder {
    fn on_map_loaded(&self) {
        self.push(EngineEvent::MapLoaded);
    }

    fn on_state_changed(&self, from: &'static str, to: &'static str) {
        self.push(EngineEvent::StateChanged { from, to });
    }
}
