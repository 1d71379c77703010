// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state derived from WAL replay.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use oj_core::{Container, ContainerLog, ContainerStatus, Event, ShipAssignment};
use serde::{Deserialize, Serialize};

fn epoch_ms_to_datetime(ms: u64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms as i64).unwrap_or_else(Utc::now)
}

/// Materialized state built from event replay: the current set of
/// containers, the ship assignment table, and per-container log buffers.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    pub containers: HashMap<String, Container>,
    /// Keyed by ship symbol. Holds the most recent assignment for that
    /// ship, active or released; there is at most one row per ship since
    /// a new assignment always replaces the previous one.
    pub ship_assignments: HashMap<String, ShipAssignment>,
    /// Keyed by container ID, append-only within a container's lifetime.
    pub container_logs: HashMap<String, Vec<ContainerLog>>,
}

impl MaterializedState {
    /// Get a container by ID or unique prefix (like git commit hashes).
    pub fn get_container(&self, id: &str) -> Option<&Container> {
        if let Some(container) = self.containers.get(id) {
            return Some(container);
        }
        let matches: Vec<_> = self
            .containers
            .iter()
            .filter(|(k, _)| k.starts_with(id))
            .collect();
        if matches.len() == 1 {
            Some(matches[0].1)
        } else {
            None
        }
    }

    pub fn active_assignment(&self, ship_symbol: &str) -> Option<&ShipAssignment> {
        self.ship_assignments
            .get(ship_symbol)
            .filter(|a| a.is_active())
    }

    pub fn logs_for(&self, container_id: &str) -> &[ContainerLog] {
        self.container_logs
            .get(container_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Apply an event to derive state changes.
    ///
    /// # Idempotency Requirement
    ///
    /// **All event handlers MUST be idempotent.** Applying the same event
    /// twice must produce the same state as applying it once, because
    /// events may be applied both for immediate visibility when a command
    /// completes and again when the daemon replays the WAL on startup.
    ///
    /// Guidelines for idempotent handlers:
    /// - Use assignment (`=`) instead of mutation (`+=`, `-=`)
    /// - Guard inserts with existence checks (`if !map.contains_key(...)`)
    /// - Guard increments and appends with a sequence/status check so a
    ///   replayed event doesn't double-apply
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::ContainerCreated {
                id,
                player_id,
                command_type,
                config,
                max_iterations,
                restart_count,
                created_at_ms,
            } => {
                if !self.containers.contains_key(id.as_str()) {
                    let mut container = Container::new(
                        id.clone(),
                        *player_id,
                        command_type.clone(),
                        config.clone(),
                        *max_iterations,
                        epoch_ms_to_datetime(*created_at_ms),
                    );
                    container.restart_count = *restart_count;
                    self.containers.insert(id.as_str().to_string(), container);
                }
            }

            Event::ContainerStarting { id } => {
                if let Some(container) = self.containers.get_mut(id.as_str()) {
                    if container.status == ContainerStatus::Pending {
                        container.status = ContainerStatus::Starting;
                    }
                }
            }

            Event::ContainerStarted { id, started_at_ms } => {
                if let Some(container) = self.containers.get_mut(id.as_str()) {
                    if container.status != ContainerStatus::Running {
                        container.status = ContainerStatus::Running;
                        container.started_at = Some(epoch_ms_to_datetime(*started_at_ms));
                    }
                }
            }

            Event::ContainerStopRequested { id } => {
                if let Some(container) = self.containers.get_mut(id.as_str()) {
                    if !container.status.is_terminal() {
                        container.status = ContainerStatus::Stopping;
                    }
                }
            }

            Event::ContainerStopped {
                id,
                exit_code,
                exit_reason,
                stopped_at_ms,
            } => {
                if let Some(container) = self.containers.get_mut(id.as_str()) {
                    if !container.status.is_terminal() {
                        container.status = ContainerStatus::Stopped;
                        container.exit_code = Some(*exit_code);
                        container.exit_reason = exit_reason.clone();
                        container.stopped_at = Some(epoch_ms_to_datetime(*stopped_at_ms));
                    }
                }
            }

            Event::ContainerFailed {
                id,
                exit_reason,
                stopped_at_ms,
            } => {
                if let Some(container) = self.containers.get_mut(id.as_str()) {
                    if !container.status.is_terminal() {
                        container.status = ContainerStatus::Failed;
                        container.exit_code = Some(1);
                        container.exit_reason = Some(exit_reason.clone());
                        container.stopped_at = Some(epoch_ms_to_datetime(*stopped_at_ms));
                    }
                }
            }

            Event::ContainerRestarted { id, restarted_at_ms } => {
                if let Some(container) = self.containers.get_mut(id.as_str()) {
                    if container.status == ContainerStatus::Failed {
                        container.restart_count += 1;
                        container.status = ContainerStatus::Pending;
                        container.exit_code = None;
                        container.exit_reason = None;
                        container.started_at = None;
                        container.stopped_at = None;
                        container.current_iteration = 0;
                        let _ = restarted_at_ms;
                    }
                }
            }

            Event::ContainerRemoved { id } => {
                self.containers.remove(id.as_str());
                self.container_logs.remove(id.as_str());
            }

            Event::ContainerMetadataUpdated { id, key, value } => {
                if let Some(container) = self.containers.get_mut(id.as_str()) {
                    container.metadata.insert(key.clone(), value.clone());
                }
            }

            Event::ContainerIterationIncremented { id } => {
                if let Some(container) = self.containers.get_mut(id.as_str()) {
                    container.current_iteration += 1;
                }
            }

            Event::ContainerLogAppended {
                container_id,
                seq,
                level,
                message,
                ts_ms,
            } => {
                let logs = self.container_logs.entry(container_id.as_str().to_string()).or_default();
                let already_applied = logs.last().is_some_and(|l| l.seq >= *seq);
                if !already_applied {
                    logs.push(ContainerLog {
                        container_id: container_id.clone(),
                        seq: *seq,
                        ts: epoch_ms_to_datetime(*ts_ms),
                        level: *level,
                        message: message.clone(),
                    });
                }
            }

            Event::ShipAssigned {
                ship_symbol,
                player_id,
                container_id,
                operation,
                assigned_at_ms,
            } => {
                let already_current = self
                    .ship_assignments
                    .get(ship_symbol)
                    .is_some_and(|a| a.container_id == *container_id);
                if !already_current {
                    self.ship_assignments.insert(
                        ship_symbol.clone(),
                        ShipAssignment::new(
                            ship_symbol.clone(),
                            *player_id,
                            container_id.clone(),
                            operation.clone(),
                            epoch_ms_to_datetime(*assigned_at_ms),
                        ),
                    );
                }
            }

            Event::ShipReleased {
                ship_symbol,
                reason,
                released_at_ms,
            } => {
                if let Some(assignment) = self.ship_assignments.get_mut(ship_symbol) {
                    if assignment.is_active() {
                        assignment.release(reason.clone(), epoch_ms_to_datetime(*released_at_ms));
                    }
                }
            }

            Event::ShipReassigned {
                ship_symbol,
                new_container_id,
                reassigned_at_ms,
                ..
            } => {
                let player_id = self
                    .ship_assignments
                    .get(ship_symbol)
                    .map(|a| a.player_id)
                    .unwrap_or_default();
                let operation = self
                    .ship_assignments
                    .get(ship_symbol)
                    .map(|a| a.operation.clone())
                    .unwrap_or_default();
                let already_current = self
                    .ship_assignments
                    .get(ship_symbol)
                    .is_some_and(|a| a.container_id == *new_container_id);
                if !already_current {
                    self.ship_assignments.insert(
                        ship_symbol.clone(),
                        ShipAssignment::new(
                            ship_symbol.clone(),
                            player_id,
                            new_container_id.clone(),
                            operation,
                            epoch_ms_to_datetime(*reassigned_at_ms),
                        ),
                    );
                }
            }

            Event::Shutdown => {}
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
