// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ContainerLog: one structured line emitted by a running container.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::ContainerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerLog {
    pub container_id: ContainerId,
    pub seq: u64,
    pub ts: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
