// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the container engine.

use oj_core::{AssignmentError, ContainerError};
use thiserror::Error;

/// Errors surfaced by an executor while a container is running.
///
/// C2 wraps these into a terminal `FAILED` transition; the message is
/// preserved verbatim in the container's `exit_reason`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{subsystem}: {message}")]
pub struct ExecuteError {
    /// Short hint at the originating subsystem, for operator grep-ability
    /// (e.g. "navigation/route/path", "dock", "orbit", "refuel", "scout").
    pub subsystem: String,
    pub message: String,
}

impl ExecuteError {
    pub fn new(subsystem: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subsystem: subsystem.into(),
            message: message.into(),
        }
    }
}

/// Errors from the container manager (C2) and its collaborators.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
    #[error("unknown command type: {0}")]
    UnknownCommandType(String),
    #[error("storage error: {0}")]
    Storage(#[from] oj_storage::WalError),
    #[error("executor failed: {0}")]
    Execute(#[from] ExecuteError),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
