// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ShipAssignment: the exclusive lock binding one ship to one container.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::ContainerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Active,
    Released,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipAssignment {
    pub ship_symbol: String,
    pub player_id: i64,
    pub container_id: ContainerId,
    pub operation: String,
    pub status: AssignmentStatus,
    pub assigned_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
    pub release_reason: Option<String>,
}

impl ShipAssignment {
    pub fn new(
        ship_symbol: String,
        player_id: i64,
        container_id: ContainerId,
        operation: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            ship_symbol,
            player_id,
            container_id,
            operation,
            status: AssignmentStatus::Active,
            assigned_at: now,
            released_at: None,
            release_reason: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AssignmentStatus::Active
    }

    pub fn release(&mut self, reason: impl Into<String>, now: DateTime<Utc>) {
        self.status = AssignmentStatus::Released;
        self.released_at = Some(now);
        self.release_reason = Some(reason.into());
    }
}

/// Reasons an assignment was released, used for both logging and the
/// persisted `release_reason` field.
pub mod release_reason {
    pub const ORPHANED_CLEANUP: &str = "orphaned_cleanup";
    pub const STALE_TIMEOUT: &str = "stale_timeout";
    pub const STALE_CLEANUP: &str = "stale_cleanup";
    pub const DAEMON_SHUTDOWN: &str = "daemon_shutdown";
    pub const MANUAL: &str = "manual";
}

#[cfg(test)]
#[path = "ship_assignment_tests.rs"]
mod tests;
