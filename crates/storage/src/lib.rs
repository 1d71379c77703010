// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Event-sourced durable storage for the operation daemon: a write-ahead
//! log of `oj_core::Event`s, a `MaterializedState` derived by replaying
//! them, and periodic compressed snapshots so startup doesn't replay the
//! whole log.

mod checkpoint;
mod event_bus;
mod migration;
mod snapshot;
mod state;
mod wal;

/// Snapshot format version. Bump when `MaterializedState`'s on-disk shape
/// changes and register a migration in `migration::MigrationRegistry`.
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

pub use checkpoint::{
    load_snapshot, CheckpointError, CheckpointResult, CheckpointWriter, Checkpointer,
    FsCheckpointWriter,
};
pub use event_bus::{EventBus, EventReader};
pub use migration::{Migration, MigrationError, MigrationRegistry};
pub use snapshot::{Snapshot, SnapshotError};
pub use state::MaterializedState;
pub use wal::{Wal, WalEntry, WalError};
