// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain-level errors shared by the storage, engine, and daemon crates.
//!
//! These are the exact, stable error strings the specification requires
//! clients to be able to match on; the RPC layer maps them to JSON-RPC
//! error codes but never rewrites the message text.

use thiserror::Error;

/// Errors from the ship assignment manager (C4).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssignmentError {
    #[error("ship is already assigned to another container")]
    AlreadyAssigned,
    #[error("ship player_id mismatch")]
    PlayerMismatch,
    #[error("no assignment found")]
    NotFound,
    #[error("assignment already released")]
    AlreadyReleased,
}

/// Errors from the container manager (C2).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("container not found")]
    NotFound,
    #[error("container must be stopped first")]
    NotTerminal,
    #[error("container cannot be restarted: {0}")]
    NotRestartable(String),
    #[error("invalid container config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
