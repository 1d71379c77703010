// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health Monitor (C5): a background task that periodically reconciles
//! ship assignments against live containers and recovers containers that
//! look stuck or stuck in a fast, iteration-churning loop.
//!
//! Runs on its own tokio task rather than as a step of a shared event
//! loop, so a slow tick never delays RPC handling or other containers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use oj_core::{release_reason, Clock};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::container_manager::ContainerManager;
use crate::ship_assignment_manager::ShipAssignmentManager;
use crate::store::Store;

/// Below this average seconds-per-iteration, a running container is
/// considered to be spinning rather than making real progress.
const INFINITE_LOOP_THRESHOLD_SECS: f64 = 5.0;

pub struct HealthMonitorConfig {
    pub interval: std::time::Duration,
    pub stale_assignment_timeout: ChronoDuration,
    pub recovery_timeout: ChronoDuration,
    pub max_recovery_attempts: u32,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            interval: std::time::Duration::from_secs(60),
            stale_assignment_timeout: ChronoDuration::minutes(30),
            recovery_timeout: ChronoDuration::seconds(300),
            max_recovery_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct WatchEntry {
    last_iteration: u32,
    last_progress_at: Option<DateTime<Utc>>,
    recovery_attempts: u32,
}

/// Counters surfaced through the `health_check` RPC method.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct HealthMetrics {
    pub ticks: u64,
    pub recovery_attempts: u64,
    pub successful_recoveries: u64,
    pub failed_recoveries: u64,
    pub abandoned_ships: u64,
}

pub struct HealthMonitor<C: Clock> {
    store: Store,
    assignments: Arc<ShipAssignmentManager>,
    containers: Arc<ContainerManager<C>>,
    clock: C,
    config: HealthMonitorConfig,
    watch: Mutex<HashMap<String, WatchEntry>>,
    metrics: Mutex<HealthMetrics>,
    last_check_time: Mutex<Option<DateTime<Utc>>>,
}

impl<C: Clock> HealthMonitor<C> {
    pub fn new(
        store: Store,
        assignments: Arc<ShipAssignmentManager>,
        containers: Arc<ContainerManager<C>>,
        clock: C,
        config: HealthMonitorConfig,
    ) -> Self {
        Self {
            store,
            assignments,
            containers,
            clock,
            config,
            watch: Mutex::new(HashMap::new()),
            metrics: Mutex::new(HealthMetrics::default()),
            last_check_time: Mutex::new(None),
        }
    }

    pub fn metrics(&self) -> HealthMetrics {
        self.metrics.lock().clone()
    }

    /// Stop tracking a container, e.g. after it has been explicitly
    /// restarted by an operator. The next tick treats it as fresh.
    pub fn reset_watch(&self, container_id: &str) {
        self.watch.lock().remove(container_id);
    }

    /// Run ticks on `config.interval` until `cancel` fires. The first tick
    /// runs immediately rather than after the first interval elapses.
    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            self.tick(self.now());
            if !self.clock.sleep(self.config.interval, &cancel).await {
                return;
            }
        }
    }

    fn now(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.clock.epoch_ms() as i64).unwrap_or_else(Utc::now)
    }

    /// One reconciliation pass: cleans up assignments orphaned or aged past
    /// `stale_assignment_timeout`, then inspects every running container for
    /// signs it is stuck or spinning.
    ///
    /// Skipped if the previous tick ran less than `config.interval` ago; the
    /// very first tick always runs regardless of `now`.
    pub fn tick(&self, now: DateTime<Utc>) {
        let interval = ChronoDuration::from_std(self.config.interval).unwrap_or(ChronoDuration::zero());
        {
            let mut last_check = self.last_check_time.lock();
            if let Some(last) = *last_check {
                if now - last < interval {
                    return;
                }
            }
            *last_check = Some(now);
        }

        self.metrics.lock().ticks += 1;

        let valid_ids: HashSet<String> = self.store.read(|s| s.containers.keys().cloned().collect());
        self.assignments.clean_orphaned(&valid_ids, now);
        self.assignments.clean_stale(self.config.stale_assignment_timeout, now);

        let running = self.containers.list();
        let running_ids: HashSet<String> = running
            .iter()
            .filter(|c| c.status == oj_core::ContainerStatus::Running)
            .map(|c| c.id.as_str().to_string())
            .collect();
        self.watch.lock().retain(|id, _| running_ids.contains(id));

        for container in running {
            if container.status != oj_core::ContainerStatus::Running {
                continue;
            }
            self.check_container(&container, now);
        }
    }

    fn check_container(&self, container: &oj_core::Container, now: DateTime<Utc>) {
        let id = container.id.as_str().to_string();
        let mut watch = self.watch.lock();
        let entry = watch.entry(id.clone()).or_insert(WatchEntry {
            last_iteration: container.current_iteration,
            last_progress_at: Some(now),
            recovery_attempts: 0,
        });

        if container.current_iteration != entry.last_iteration {
            entry.last_iteration = container.current_iteration;
            entry.last_progress_at = Some(now);
        }

        let stuck = entry
            .last_progress_at
            .is_some_and(|since| now - since > self.config.recovery_timeout);
        let spinning = container
            .avg_seconds_per_iteration(now)
            .is_some_and(|secs| secs < INFINITE_LOOP_THRESHOLD_SECS);

        if !stuck && !spinning {
            return;
        }

        if entry.recovery_attempts >= self.config.max_recovery_attempts {
            drop(watch);
            self.abandon(&id, now);
            return;
        }

        entry.recovery_attempts += 1;
        drop(watch);

        self.metrics.lock().recovery_attempts += 1;
        match self.containers.stop(&id) {
            Ok(()) => self.metrics.lock().successful_recoveries += 1,
            Err(e) => {
                tracing::warn!(container_id = %id, error = %e, "recovery stop failed");
                self.metrics.lock().failed_recoveries += 1;
            }
        }
    }

    fn abandon(&self, container_id: &str, now: DateTime<Utc>) {
        self.watch.lock().remove(container_id);
        self.metrics.lock().abandoned_ships += 1;
        let ship_symbol = self.store.read(|s| {
            s.ship_assignments
                .values()
                .find(|a| a.is_active() && a.container_id.as_str() == container_id)
                .map(|a| a.ship_symbol.clone())
        });
        if let Some(ship_symbol) = ship_symbol {
            self.assignments
                .force_release(&ship_symbol, release_reason::STALE_CLEANUP, now);
        }
        let _ = self.containers.stop(container_id);
        tracing::warn!(container_id, "recovery attempts exhausted, abandoning");
    }
}

#[cfg(test)]
#[path = "health_monitor_tests.rs"]
mod tests;
