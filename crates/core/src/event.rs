// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events are the facts the write-ahead log persists. All observable state
//! is derived by replaying them through `MaterializedState::apply_event`,
//! which every variant's handler must apply idempotently: replaying the
//! same event twice must produce the same state as replaying it once.

use serde::{Deserialize, Serialize};

use crate::container::CommandType;
use crate::id::ContainerId;
use crate::log::LogLevel;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "container:created")]
    ContainerCreated {
        id: ContainerId,
        player_id: i64,
        command_type: CommandType,
        config: serde_json::Value,
        max_iterations: i64,
        /// Carried forward from the predecessor when this container was
        /// created by a restart, so `restart_count <= max_restarts` holds
        /// across the identity change rather than resetting to zero.
        #[serde(default)]
        restart_count: u32,
        created_at_ms: u64,
    },

    /// Emitted synchronously by `create()` right after `ContainerCreated`,
    /// before the background task is spawned, so the row is never
    /// observable as `PENDING` once a task has been scheduled for it.
    #[serde(rename = "container:starting")]
    ContainerStarting { id: ContainerId },

    #[serde(rename = "container:started")]
    ContainerStarted { id: ContainerId, started_at_ms: u64 },

    #[serde(rename = "container:stop_requested")]
    ContainerStopRequested { id: ContainerId },

    #[serde(rename = "container:stopped")]
    ContainerStopped {
        id: ContainerId,
        exit_code: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_reason: Option<String>,
        stopped_at_ms: u64,
    },

    #[serde(rename = "container:failed")]
    ContainerFailed {
        id: ContainerId,
        exit_reason: String,
        stopped_at_ms: u64,
    },

    #[serde(rename = "container:restarted")]
    ContainerRestarted { id: ContainerId, restarted_at_ms: u64 },

    #[serde(rename = "container:removed")]
    ContainerRemoved { id: ContainerId },

    #[serde(rename = "container:metadata_updated")]
    ContainerMetadataUpdated {
        id: ContainerId,
        key: String,
        value: String,
    },

    #[serde(rename = "container:iteration_incremented")]
    ContainerIterationIncremented { id: ContainerId },

    #[serde(rename = "container:log_appended")]
    ContainerLogAppended {
        container_id: ContainerId,
        /// Assigned by the writer from a per-container counter so replay can
        /// tell a re-applied event from a genuinely new log line.
        seq: u64,
        level: LogLevel,
        message: String,
        ts_ms: u64,
    },

    #[serde(rename = "ship:assigned")]
    ShipAssigned {
        ship_symbol: String,
        player_id: i64,
        container_id: ContainerId,
        operation: String,
        assigned_at_ms: u64,
    },

    #[serde(rename = "ship:released")]
    ShipReleased {
        ship_symbol: String,
        reason: String,
        released_at_ms: u64,
    },

    #[serde(rename = "ship:reassigned")]
    ShipReassigned {
        ship_symbol: String,
        old_container_id: ContainerId,
        new_container_id: ContainerId,
        reassigned_at_ms: u64,
    },

    /// Signals the engine loop to stop draining the event bus. Never
    /// written to the WAL; see `oj_daemon::lifecycle` for shutdown ordering.
    #[serde(rename = "system:shutdown")]
    Shutdown,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ContainerCreated { .. } => "container:created",
            Event::ContainerStarting { .. } => "container:starting",
            Event::ContainerStarted { .. } => "container:started",
            Event::ContainerStopRequested { .. } => "container:stop_requested",
            Event::ContainerStopped { .. } => "container:stopped",
            Event::ContainerFailed { .. } => "container:failed",
            Event::ContainerRestarted { .. } => "container:restarted",
            Event::ContainerRemoved { .. } => "container:removed",
            Event::ContainerMetadataUpdated { .. } => "container:metadata_updated",
            Event::ContainerIterationIncremented { .. } => "container:iteration_incremented",
            Event::ContainerLogAppended { .. } => "container:log_appended",
            Event::ShipAssigned { .. } => "ship:assigned",
            Event::ShipReleased { .. } => "ship:released",
            Event::ShipReassigned { .. } => "ship:reassigned",
            Event::Shutdown => "system:shutdown",
        }
    }

    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            Event::ContainerCreated {
                id, command_type, ..
            } => format!("{t} id={id} op={}", command_type.operation()),
            Event::ContainerStarting { id } => format!("{t} id={id}"),
            Event::ContainerStarted { id, .. } => format!("{t} id={id}"),
            Event::ContainerStopRequested { id } => format!("{t} id={id}"),
            Event::ContainerStopped { id, exit_code, .. } => {
                format!("{t} id={id} exit={exit_code}")
            }
            Event::ContainerFailed { id, exit_reason, .. } => {
                format!("{t} id={id} reason={exit_reason}")
            }
            Event::ContainerRestarted { id, .. } => format!("{t} id={id}"),
            Event::ContainerRemoved { id } => format!("{t} id={id}"),
            Event::ContainerMetadataUpdated { id, key, .. } => format!("{t} id={id} key={key}"),
            Event::ContainerIterationIncremented { id } => format!("{t} id={id}"),
            Event::ContainerLogAppended {
                container_id,
                seq,
                level,
                ..
            } => format!("{t} id={container_id} seq={seq} level={level:?}"),
            Event::ShipAssigned {
                ship_symbol,
                container_id,
                ..
            } => format!("{t} ship={ship_symbol} container={container_id}"),
            Event::ShipReleased {
                ship_symbol,
                reason,
                ..
            } => format!("{t} ship={ship_symbol} reason={reason}"),
            Event::ShipReassigned {
                ship_symbol,
                new_container_id,
                ..
            } => format!("{t} ship={ship_symbol} container={new_container_id}"),
            Event::Shutdown => t.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
