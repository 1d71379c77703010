// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ship Assignment Manager (C4): exclusive ship -> container bindings.
//!
//! All operations go through the shared [`Store`], so the persisted row is
//! always the source of truth and every mutation is visible to C2/C5/C6 as
//! soon as it returns.

use chrono::{DateTime, Utc};
use oj_core::{release_reason, AssignmentError, ContainerId, Event, ShipAssignment};

use crate::store::Store;

pub struct ShipAssignmentManager {
    store: Store,
}

impl ShipAssignmentManager {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn get(&self, ship_symbol: &str) -> Option<ShipAssignment> {
        self.store
            .read(|s| s.ship_assignments.get(ship_symbol).cloned())
    }

    fn active(&self, ship_symbol: &str) -> Option<ShipAssignment> {
        self.store.read(|s| s.active_assignment(ship_symbol).cloned())
    }

    pub fn assign(
        &self,
        ship_symbol: &str,
        player_id: i64,
        container_id: ContainerId,
        operation: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AssignmentError> {
        if let Some(existing) = self.active(ship_symbol) {
            if existing.player_id != player_id {
                return Err(AssignmentError::PlayerMismatch);
            }
            return Err(AssignmentError::AlreadyAssigned);
        }
        let event = Event::ShipAssigned {
            ship_symbol: ship_symbol.to_string(),
            player_id,
            container_id,
            operation: operation.to_string(),
            assigned_at_ms: now.timestamp_millis() as u64,
        };
        let _ = self.store.apply(event);
        Ok(())
    }

    pub fn release(&self, ship_symbol: &str, reason: &str, now: DateTime<Utc>) -> Result<(), AssignmentError> {
        match self.get(ship_symbol) {
            None => Err(AssignmentError::NotFound),
            Some(a) if !a.is_active() => Err(AssignmentError::AlreadyReleased),
            Some(_) => {
                let event = Event::ShipReleased {
                    ship_symbol: ship_symbol.to_string(),
                    reason: reason.to_string(),
                    released_at_ms: now.timestamp_millis() as u64,
                };
                let _ = self.store.apply(event);
                Ok(())
            }
        }
    }

    /// Release regardless of current status; used by stale/orphan cleanup.
    pub fn force_release(&self, ship_symbol: &str, reason: &str, now: DateTime<Utc>) {
        if self.active(ship_symbol).is_some() {
            let event = Event::ShipReleased {
                ship_symbol: ship_symbol.to_string(),
                reason: reason.to_string(),
                released_at_ms: now.timestamp_millis() as u64,
            };
            let _ = self.store.apply(event);
        }
    }

    pub fn reassign(
        &self,
        ship_symbol: &str,
        old_container_id: &ContainerId,
        new_container_id: ContainerId,
        now: DateTime<Utc>,
    ) -> Result<(), AssignmentError> {
        match self.active(ship_symbol) {
            Some(a) if a.container_id == *old_container_id => {
                let event = Event::ShipReassigned {
                    ship_symbol: ship_symbol.to_string(),
                    old_container_id: old_container_id.clone(),
                    new_container_id,
                    reassigned_at_ms: now.timestamp_millis() as u64,
                };
                let _ = self.store.apply(event);
                Ok(())
            }
            Some(a) if a.container_id == new_container_id => Ok(()),
            _ => Err(AssignmentError::NotFound),
        }
    }

    pub fn release_all(&self, reason: &str, now: DateTime<Utc>) {
        let ships: Vec<String> = self
            .store
            .read(|s| s.ship_assignments.values().filter(|a| a.is_active()).map(|a| a.ship_symbol.clone()).collect());
        for ship in ships {
            self.force_release(&ship, reason, now);
        }
    }

    /// Release every active assignment whose container id is not in `valid_container_ids`.
    pub fn clean_orphaned(&self, valid_container_ids: &std::collections::HashSet<String>, now: DateTime<Utc>) -> usize {
        let orphans: Vec<String> = self.store.read(|s| {
            s.ship_assignments
                .values()
                .filter(|a| a.is_active() && !valid_container_ids.contains(a.container_id.as_str()))
                .map(|a| a.ship_symbol.clone())
                .collect()
        });
        for ship in &orphans {
            self.force_release(ship, release_reason::ORPHANED_CLEANUP, now);
        }
        orphans.len()
    }

    /// Release every active assignment older than `timeout`. Boundary: an
    /// assignment aged exactly `timeout` is NOT stale.
    pub fn clean_stale(&self, timeout: chrono::Duration, now: DateTime<Utc>) -> usize {
        let stale: Vec<String> = self.store.read(|s| {
            s.ship_assignments
                .values()
                .filter(|a| a.is_active() && now - a.assigned_at > timeout)
                .map(|a| a.ship_symbol.clone())
                .collect()
        });
        for ship in &stale {
            self.force_release(ship, release_reason::STALE_TIMEOUT, now);
        }
        stale.len()
    }
}

#[cfg(test)]
#[path = "ship_assignment_manager_tests.rs"]
mod tests;
