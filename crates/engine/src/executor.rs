// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The executor contract: the opaque function that performs a container's
//! work. The daemon supplies the handle, params, and cancellation token;
//! executors honour cancellation at suspension points and return an exit
//! summary the container manager turns into a terminal state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use oj_core::{Clock, ContainerId, LogLevel};
use tokio_util::sync::CancellationToken;

use crate::error::ExecuteError;
use crate::store::Store;

/// Handle an executor uses to report progress back to the container manager.
///
/// Every call durably records state: `log` appends a `ContainerLogAppended`
/// event, `update_metadata`/`increment_iteration` likewise go through the
/// shared [`Store`] so replay after a crash reconstructs exactly what the
/// executor had observed.
#[derive(Clone)]
pub struct ContainerHandle<C: Clock> {
    container_id: ContainerId,
    store: Store,
    clock: C,
    cancel: CancellationToken,
    log_seq: Arc<AtomicU64>,
}

impl<C: Clock> ContainerHandle<C> {
    pub fn new(container_id: ContainerId, store: Store, clock: C, cancel: CancellationToken) -> Self {
        Self {
            container_id,
            store,
            clock,
            cancel,
            log_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn id(&self) -> &ContainerId {
        &self.container_id
    }

    /// Append a structured log line for this container.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let seq = self.log_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let event = oj_core::Event::ContainerLogAppended {
            container_id: self.container_id.clone(),
            seq,
            level,
            message: message.into(),
            ts_ms: self.clock.epoch_ms(),
        };
        if let Err(e) = self.store.apply(event) {
            tracing::warn!(container_id = %self.container_id, error = %e, "failed to persist log line");
        }
    }

    pub fn update_metadata(&self, key: impl Into<String>, value: impl Into<String>) {
        let event = oj_core::Event::ContainerMetadataUpdated {
            id: self.container_id.clone(),
            key: key.into(),
            value: value.into(),
        };
        if let Err(e) = self.store.apply(event) {
            tracing::warn!(container_id = %self.container_id, error = %e, "failed to persist metadata update");
        }
    }

    pub fn increment_iteration(&self) {
        let event = oj_core::Event::ContainerIterationIncremented {
            id: self.container_id.clone(),
        };
        if let Err(e) = self.store.apply(event) {
            tracing::warn!(container_id = %self.container_id, error = %e, "failed to persist iteration increment");
        }
    }

    pub fn check_cancellation(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sleep preemptibly; returns `false` if cancelled before the duration elapsed.
    pub async fn sleep(&self, duration: std::time::Duration) -> bool {
        self.clock.sleep(duration, &self.cancel).await
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Outcome of a completed executor run.
pub struct ExecutionOutcome {
    pub exit_code: i32,
    pub summary: serde_json::Value,
}

impl ExecutionOutcome {
    pub fn success(summary: serde_json::Value) -> Self {
        Self {
            exit_code: 0,
            summary,
        }
    }
}

/// An executor performs one container's work: `(handle, params, cancel) ->
/// (exit_code, summary)`. Implementations must poll `check_cancellation` at
/// suspension points and return promptly once it is signalled.
#[async_trait]
pub trait Executor<C: Clock>: Send + Sync {
    async fn run(
        &self,
        handle: ContainerHandle<C>,
        params: serde_json::Value,
    ) -> Result<ExecutionOutcome, ExecuteError>;
}

/// Resolves a `command_type` to its executor implementation.
pub struct ExecutorRegistry<C: Clock> {
    executors: HashMap<oj_core::CommandType, Arc<dyn Executor<C>>>,
}

impl<C: Clock> Default for ExecutorRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> ExecutorRegistry<C> {
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    pub fn register(&mut self, command_type: oj_core::CommandType, executor: Arc<dyn Executor<C>>) {
        self.executors.insert(command_type, executor);
    }

    pub fn get(&self, command_type: oj_core::CommandType) -> Option<Arc<dyn Executor<C>>> {
        self.executors.get(&command_type).cloned()
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
