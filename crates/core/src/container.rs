// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container: the unit of durable background execution.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::id::ContainerId;

/// The kind of automation a container runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    NavigateShip,
    DockShip,
    OrbitShip,
    RefuelShip,
    ScoutMarketsVrp,
    ScoutTour,
    BatchContractWorkflow,
    PurchaseShip,
    BatchPurchaseShips,
}

impl CommandType {
    /// Short verb used for container-id generation and assignment `operation`.
    pub fn operation(&self) -> &'static str {
        match self {
            CommandType::NavigateShip => "navigate",
            CommandType::DockShip => "dock",
            CommandType::OrbitShip => "orbit",
            CommandType::RefuelShip => "refuel",
            CommandType::ScoutMarketsVrp => "scout",
            CommandType::ScoutTour => "scout-tour",
            CommandType::BatchContractWorkflow => "contract",
            CommandType::PurchaseShip => "purchase",
            CommandType::BatchPurchaseShips => "batch-purchase",
        }
    }
}

/// Lifecycle status of a container. See the container state machine:
/// `PENDING -> STARTING -> RUNNING -> STOPPING -> STOPPED`, with `FAILED`
/// reachable from any non-terminal state and `PENDING` reachable from
/// `FAILED` via restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerStatus {
    Pending,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl ContainerStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ContainerStatus::Stopped | ContainerStatus::Failed)
    }
}

/// A durable, isolated background execution of one command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub player_id: i64,
    pub command_type: CommandType,
    pub config: serde_json::Value,
    pub status: ContainerStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
    pub exit_reason: Option<String>,
    pub current_iteration: u32,
    /// `-1` means unbounded (runs until stopped or it fails).
    pub max_iterations: i64,
    pub restart_count: u32,
    pub max_restarts: u32,
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

pub const DEFAULT_MAX_RESTARTS: u32 = 3;

impl Container {
    pub fn new(
        id: ContainerId,
        player_id: i64,
        command_type: CommandType,
        config: serde_json::Value,
        max_iterations: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            player_id,
            command_type,
            config,
            status: ContainerStatus::Pending,
            started_at: None,
            stopped_at: None,
            exit_code: None,
            exit_reason: None,
            current_iteration: 0,
            max_iterations,
            restart_count: 0,
            max_restarts: DEFAULT_MAX_RESTARTS,
            metadata: HashMap::new(),
            created_at: now,
        }
    }

    /// Average seconds per iteration, for the infinite-loop heuristic.
    /// `None` when there isn't enough information to judge (no iterations
    /// yet, or the container never started).
    pub fn avg_seconds_per_iteration(&self, now: DateTime<Utc>) -> Option<f64> {
        if self.current_iteration == 0 {
            return None;
        }
        let started_at = self.started_at?;
        let elapsed = (now - started_at).num_milliseconds().max(0) as f64 / 1000.0;
        Some(elapsed / self.current_iteration as f64)
    }

    pub fn can_restart(&self) -> bool {
        self.status == ContainerStatus::Failed && self.restart_count < self.max_restarts
    }
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
