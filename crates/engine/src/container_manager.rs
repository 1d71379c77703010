// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container Manager (C2): owns the container lifecycle state machine and
//! the tokio task each running container executes under.
//!
//! Every container runs as its own task rather than a step in a shared
//! event loop, so a slow or stuck container never blocks another. The
//! manager only ever touches in-memory task handles for cancellation;
//! everything a caller can observe (`list`/`inspect`/`logs`) comes from the
//! [`Store`], which is also what startup recovery replays.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use oj_core::{
    generate_container_id, Clock, CommandType, Container, ContainerError, ContainerId,
    ContainerLog, Event,
};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::executor::{ContainerHandle, ExecutorRegistry};
use crate::ship_assignment_manager::ShipAssignmentManager;
use crate::store::Store;

fn epoch_ms_to_datetime(ms: u64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms as i64).unwrap_or_else(Utc::now)
}

struct RunningTask {
    cancel: CancellationToken,
    #[allow(dead_code)]
    handle: JoinHandle<()>,
}

/// Tracks the live tokio task backing each non-terminal container. Purely
/// an in-process cancellation index; the container's observable state
/// always lives in the `Store`.
type TaskTable = Arc<Mutex<HashMap<String, RunningTask>>>;

pub struct ContainerManager<C: Clock> {
    store: Store,
    assignments: Arc<ShipAssignmentManager>,
    registry: Arc<ExecutorRegistry<C>>,
    clock: C,
    tasks: TaskTable,
}

impl<C: Clock> ContainerManager<C> {
    pub fn new(
        store: Store,
        assignments: Arc<ShipAssignmentManager>,
        registry: Arc<ExecutorRegistry<C>>,
        clock: C,
    ) -> Self {
        Self {
            store,
            assignments,
            registry,
            clock,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create and start a new container bound to `ship_symbol`. The ship
    /// must not already hold an active assignment for a different player.
    /// `id` overrides the derived container id when the caller supplies one
    /// explicitly (the RPC `container.create` method's optional `container_id`).
    pub fn create(
        &self,
        id: Option<ContainerId>,
        player_id: i64,
        command_type: CommandType,
        ship_symbol: &str,
        params: serde_json::Value,
        max_iterations: i64,
    ) -> Result<ContainerId, EngineError> {
        let now = epoch_ms_to_datetime(self.clock.epoch_ms());
        let id = id.unwrap_or_else(|| generate_container_id(command_type.operation(), ship_symbol));

        self.assignments
            .assign(ship_symbol, player_id, id.clone(), command_type.operation(), now)?;

        self.store.apply(Event::ContainerCreated {
            id: id.clone(),
            player_id,
            command_type,
            config: params.clone(),
            max_iterations,
            restart_count: 0,
            created_at_ms: self.clock.epoch_ms(),
        })?;
        self.store.apply(Event::ContainerStarting { id: id.clone() })?;

        self.spawn(id.clone(), command_type, params);
        Ok(id)
    }

    /// Reconstruct the executor and start the background task for a
    /// container that already has a persisted `RUNNING`/`STARTING` row
    /// (startup recovery). Unlike `create`, this does not emit
    /// `ContainerCreated` or touch assignments; the caller has already
    /// validated the row and is responsible for assignment bookkeeping.
    pub fn resume(&self, id: ContainerId, command_type: CommandType, params: serde_json::Value) {
        self.spawn(id, command_type, params);
    }

    fn spawn(&self, id: ContainerId, command_type: CommandType, params: serde_json::Value) {
        let store = self.store.clone();
        let clock = self.clock.clone();
        let cancel = CancellationToken::new();
        let registry = Arc::clone(&self.registry);
        let tasks = Arc::clone(&self.tasks);

        let task_cancel = cancel.clone();
        let task_id = id.clone();
        let join = tokio::spawn(async move {
            let _ = store.apply(Event::ContainerStarted {
                id: task_id.clone(),
                started_at_ms: clock.epoch_ms(),
            });

            let executor = registry.get(command_type);
            let handle = ContainerHandle::new(task_id.clone(), store.clone(), clock.clone(), task_cancel.clone());

            let outcome = match executor {
                Some(executor) => executor.run(handle, params).await,
                None => Err(crate::error::ExecuteError::new(
                    "registry",
                    format!("no executor registered for {command_type:?}"),
                )),
            };

            let stopped_at_ms = clock.epoch_ms();
            let event = if task_cancel.is_cancelled() {
                Event::ContainerStopped {
                    id: task_id.clone(),
                    exit_code: outcome.as_ref().map(|o| o.exit_code).unwrap_or(1),
                    exit_reason: Some("cancelled".to_string()),
                    stopped_at_ms,
                }
            } else {
                match outcome {
                    Ok(outcome) => Event::ContainerStopped {
                        id: task_id.clone(),
                        exit_code: outcome.exit_code,
                        exit_reason: None,
                        stopped_at_ms,
                    },
                    Err(e) => Event::ContainerFailed {
                        id: task_id.clone(),
                        exit_reason: e.to_string(),
                        stopped_at_ms,
                    },
                }
            };
            if let Err(e) = store.apply(event) {
                tracing::error!(container_id = %task_id, error = %e, "failed to persist terminal state");
            }
            tasks.lock().remove(task_id.as_str());
        });

        self.tasks
            .lock()
            .insert(id.as_str().to_string(), RunningTask { cancel, handle: join });
    }

    /// Request a container stop. Idempotent on containers already terminal.
    /// Signals the container's cancellation token and returns without
    /// waiting for the task to actually exit; the executor contract
    /// requires honouring cancellation within a bounded time.
    pub fn stop(&self, container_id: &str) -> Result<(), EngineError> {
        let container = self
            .store
            .read(|s| s.get_container(container_id).cloned())
            .ok_or(ContainerError::NotFound)?;

        if container.status.is_terminal() {
            return Ok(());
        }

        self.store.apply(Event::ContainerStopRequested {
            id: container.id.clone(),
        })?;

        if let Some(task) = self.tasks.lock().get(container.id.as_str()) {
            task.cancel.cancel();
        }
        Ok(())
    }

    /// Signal every non-terminal container to stop, for daemon shutdown.
    pub fn stop_all(&self) {
        let ids: Vec<String> = self.store.read(|s| {
            s.containers
                .values()
                .filter(|c| !c.status.is_terminal())
                .map(|c| c.id.as_str().to_string())
                .collect()
        });
        for id in ids {
            let _ = self.stop(&id);
        }
    }

    /// Remove a terminal container and its logs.
    pub fn remove(&self, container_id: &str) -> Result<(), EngineError> {
        let container = self
            .store
            .read(|s| s.get_container(container_id).cloned())
            .ok_or(ContainerError::NotFound)?;

        if !container.status.is_terminal() {
            return Err(ContainerError::NotTerminal.into());
        }

        self.store.apply(Event::ContainerRemoved {
            id: container.id.clone(),
        })?;
        self.tasks.lock().remove(container.id.as_str());
        Ok(())
    }

    /// Restart a failed container under a fresh identity. The old row is
    /// left in place as a terminal historical record; the ship lock is
    /// moved atomically from the old id to the new one so there is never
    /// a window where the ship looks unassigned or bound to a dead
    /// container.
    pub fn restart(&self, container_id: &str) -> Result<ContainerId, EngineError> {
        let container = self
            .store
            .read(|s| s.get_container(container_id).cloned())
            .ok_or(ContainerError::NotFound)?;

        if !container.can_restart() {
            return Err(ContainerError::NotRestartable(format!(
                "status={:?} restart_count={} max_restarts={}",
                container.status, container.restart_count, container.max_restarts
            ))
            .into());
        }

        let ship_symbol = self.store.read(|s| {
            s.ship_assignments
                .values()
                .find(|a| a.is_active() && a.container_id == container.id)
                .map(|a| a.ship_symbol.clone())
        });
        let ship_symbol = ship_symbol.ok_or_else(|| {
            ContainerError::NotRestartable("no active ship assignment to carry over".to_string())
        })?;

        let now = epoch_ms_to_datetime(self.clock.epoch_ms());
        let new_id = generate_container_id(container.command_type.operation(), &ship_symbol);

        self.store.apply(Event::ContainerCreated {
            id: new_id.clone(),
            player_id: container.player_id,
            command_type: container.command_type,
            config: container.config.clone(),
            max_iterations: container.max_iterations,
            restart_count: container.restart_count + 1,
            created_at_ms: self.clock.epoch_ms(),
        })?;
        self.store.apply(Event::ContainerStarting { id: new_id.clone() })?;
        self.assignments
            .reassign(&ship_symbol, &container.id, new_id.clone(), now)?;

        self.spawn(new_id.clone(), container.command_type, container.config.clone());
        Ok(new_id)
    }

    pub fn list(&self) -> Vec<Container> {
        self.store.read(|s| s.containers.values().cloned().collect())
    }

    pub fn inspect(&self, container_id: &str) -> Option<Container> {
        self.store.read(|s| s.get_container(container_id).cloned())
    }

    pub fn logs(&self, container_id: &str) -> Vec<ContainerLog> {
        self.store.read(|s| s.logs_for(container_id).to_vec())
    }
}

#[cfg(test)]
#[path = "container_manager_tests.rs"]
mod tests;
