// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in executors for the game-automation command types.
//!
//! The real handler bodies talk to the remote game HTTP API; that client
//! is out of scope here (see the scope note in the crate's design doc).
//! These executors honour the executor contract faithfully — suspension
//! points via the clock abstraction, prompt cancellation, iteration
//! counting, structured logs with a subsystem hint — against simulated
//! work, so the container lifecycle around them is exercised end to end.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use oj_core::{Clock, CommandType, LogLevel};

use crate::error::ExecuteError;
use crate::executor::{ContainerHandle, ExecutionOutcome, Executor, ExecutorRegistry};

/// One simulated step of a command: sleep for an interval, then count an
/// iteration. Repeated `iterations` times, preemptible at every sleep.
struct SimulatedExecutor<C: Clock> {
    subsystem: &'static str,
    default_iterations: u32,
    default_interval: Duration,
    _clock: PhantomData<C>,
}

impl<C: Clock> SimulatedExecutor<C> {
    fn new(subsystem: &'static str, default_iterations: u32, default_interval: Duration) -> Self {
        Self {
            subsystem,
            default_iterations,
            default_interval,
            _clock: PhantomData,
        }
    }
}

#[async_trait]
impl<C: Clock> Executor<C> for SimulatedExecutor<C> {
    async fn run(
        &self,
        handle: ContainerHandle<C>,
        params: serde_json::Value,
    ) -> Result<ExecutionOutcome, ExecuteError> {
        let iterations = params
            .get("iterations")
            .and_then(|v| v.as_u64())
            .map(|n| n as u32)
            .unwrap_or(self.default_iterations);
        let interval = params
            .get("duration_secs")
            .and_then(|v| v.as_u64())
            .map(Duration::from_secs)
            .unwrap_or(self.default_interval);

        handle.log(
            LogLevel::Info,
            format!("{}: starting ({iterations} iteration(s))", self.subsystem),
        );

        for step in 0..iterations {
            if handle.check_cancellation() {
                handle.log(
                    LogLevel::Info,
                    format!("{}: stopped before step {step}", self.subsystem),
                );
                return Ok(ExecutionOutcome {
                    exit_code: 0,
                    summary: serde_json::json!({"cancelled": true, "completed_steps": step}),
                });
            }
            if !handle.sleep(interval).await {
                handle.log(
                    LogLevel::Info,
                    format!("{}: cancelled mid-sleep at step {step}", self.subsystem),
                );
                return Ok(ExecutionOutcome {
                    exit_code: 0,
                    summary: serde_json::json!({"cancelled": true, "completed_steps": step}),
                });
            }
            handle.increment_iteration();
        }

        handle.log(LogLevel::Info, format!("{}: complete", self.subsystem));
        Ok(ExecutionOutcome::success(serde_json::json!({
            "operation": self.subsystem,
            "iterations": iterations,
            "params": params,
        })))
    }
}

/// Register the stock simulated executor for every known command type.
/// Callers may `register` a replacement afterwards to override any of them.
pub fn register_builtins<C: Clock>(registry: &mut ExecutorRegistry<C>) {
    let one_shot = |subsystem, interval_secs| {
        std::sync::Arc::new(SimulatedExecutor::new(
            subsystem,
            1,
            Duration::from_secs(interval_secs),
        )) as std::sync::Arc<dyn Executor<C>>
    };
    let multi_step = |subsystem, steps, interval_secs| {
        std::sync::Arc::new(SimulatedExecutor::new(
            subsystem,
            steps,
            Duration::from_secs(interval_secs),
        )) as std::sync::Arc<dyn Executor<C>>
    };

    registry.register(CommandType::NavigateShip, one_shot("navigation/route/path", 30));
    registry.register(CommandType::DockShip, one_shot("dock", 2));
    registry.register(CommandType::OrbitShip, one_shot("orbit", 2));
    registry.register(CommandType::RefuelShip, one_shot("refuel", 5));
    registry.register(CommandType::PurchaseShip, one_shot("purchase", 2));
    registry.register(CommandType::ScoutMarketsVrp, multi_step("scout", 5, 10));
    registry.register(CommandType::ScoutTour, multi_step("scout-tour", 5, 10));
    registry.register(
        CommandType::BatchContractWorkflow,
        multi_step("contract", 3, 15),
    );
    registry.register(
        CommandType::BatchPurchaseShips,
        multi_step("batch-purchase", 3, 2),
    );
}

#[cfg(test)]
#[path = "executors_tests.rs"]
mod tests;
