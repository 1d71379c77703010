// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared handle onto materialized state and the durable event log.
//!
//! Every component that mutates domain state (container manager, ship
//! assignment manager, health monitor) goes through a `Store`. Applying an
//! event updates the in-memory view and appends it to the WAL in the same
//! call so the two never drift; `apply_event` being idempotent means the
//! replay-on-startup path can reapply the same events safely.

use std::sync::Arc;

use oj_core::Event;
use oj_storage::{EventBus, MaterializedState, WalError};
use parking_lot::Mutex;

#[derive(Clone)]
pub struct Store {
    state: Arc<Mutex<MaterializedState>>,
    event_bus: EventBus,
}

impl Store {
    pub fn new(state: Arc<Mutex<MaterializedState>>, event_bus: EventBus) -> Self {
        Self { state, event_bus }
    }

    /// Apply an event to in-memory state and durably queue it on the WAL.
    pub fn apply(&self, event: Event) -> Result<u64, WalError> {
        self.state.lock().apply_event(&event);
        self.event_bus.send(&event)
    }

    pub fn read<T>(&self, f: impl FnOnce(&MaterializedState) -> T) -> T {
        f(&self.state.lock())
    }

    pub fn state(&self) -> Arc<Mutex<MaterializedState>> {
        Arc::clone(&self.state)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
