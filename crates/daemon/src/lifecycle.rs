// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, recovery, shutdown.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use fs2::FileExt;
use oj_core::{release_reason, Clock, Event, SystemClock};
use oj_engine::{register_builtins, ContainerManager, ExecutorRegistry, HealthMonitor, HealthMonitorConfig, ShipAssignmentManager, Store};
use oj_storage::{EventBus, MaterializedState, Snapshot, Wal};
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

/// Daemon configuration, loaded once from `OPD_*` environment variables.
/// See `crate::env` for the default for each.
#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub version_path: PathBuf,
    pub log_path: PathBuf,
    pub wal_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub health_check_interval: Duration,
    pub stale_assignment_timeout: chrono::Duration,
    pub max_recovery_attempts: u32,
    pub request_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Config {
    /// Load configuration. Falls back to `<cwd>/var` when `OPD_STATE_DIR`
    /// is unset; never fails, since there is always a usable default.
    pub fn load() -> Self {
        let state_dir = crate::env::state_dir();
        Self {
            socket_path: crate::env::socket_path(&state_dir),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            wal_path: state_dir.join("wal").join("events.wal"),
            snapshot_path: state_dir.join("snapshot.json"),
            health_check_interval: crate::env::health_check_interval(),
            stale_assignment_timeout: crate::env::stale_assignment_timeout(),
            max_recovery_attempts: crate::env::max_recovery_attempts(),
            request_timeout: crate::env::request_timeout(),
            shutdown_grace: crate::env::shutdown_grace(),
            state_dir,
        }
    }
}

/// Daemon state during operation.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): held to maintain the exclusive lock; released on drop.
    #[allow(dead_code)]
    lock_file: File,
    pub store: Store,
    pub containers: Arc<ContainerManager<SystemClock>>,
    pub assignments: Arc<ShipAssignmentManager>,
    pub health: Arc<HealthMonitor<SystemClock>>,
    pub start_time: Instant,
}

/// Result of daemon startup: the daemon state and the bound listener,
/// returned separately so `main` can spawn the listener as its own task.
pub struct StartupResult {
    pub daemon: DaemonState,
    pub listener: UnixListener,
}

impl DaemonState {
    /// Shut down gracefully: signal every running container, wait up to
    /// `config.shutdown_grace` for them to exit on their own, force any
    /// stragglers to `STOPPED`, release every assignment, flush and
    /// checkpoint persistence, and unlink the socket.
    pub async fn shutdown(&self) -> Result<(), LifecycleError> {
        info!("shutting down daemon");

        self.containers.stop_all();

        let deadline = Instant::now() + self.config.shutdown_grace;
        while Instant::now() < deadline {
            let all_terminal = self
                .store
                .read(|s| s.containers.values().all(|c| c.status.is_terminal()));
            if all_terminal {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let stragglers: Vec<String> = self.store.read(|s| {
            s.containers
                .values()
                .filter(|c| !c.status.is_terminal())
                .map(|c| c.id.as_str().to_string())
                .collect()
        });
        if !stragglers.is_empty() {
            warn!(count = stragglers.len(), "forcing straggler containers to STOPPED");
        }
        let stopped_at_ms = SystemClock.epoch_ms();
        for id in stragglers {
            let _ = self.store.apply(Event::ContainerStopped {
                id: oj_core::ContainerId::new(id),
                exit_code: 1,
                exit_reason: Some("daemon_shutdown".to_string()),
                stopped_at_ms,
            });
        }

        self.assignments.release_all(release_reason::DAEMON_SHUTDOWN, Utc::now());

        if let Err(e) = self.store.event_bus().flush() {
            warn!("failed to flush WAL on shutdown: {}", e);
        }

        let processed_seq = self.store.event_bus().processed_seq();
        if processed_seq > 0 {
            let state_clone = self.store.read(|s| s.clone());
            let snapshot = Snapshot::new(processed_seq, state_clone);
            match snapshot.save(&self.config.snapshot_path) {
                Ok(()) => info!(seq = processed_seq, "saved final shutdown snapshot"),
                Err(e) => warn!("failed to save shutdown snapshot: {}", e),
            }
        }

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("failed to remove socket file: {}", e);
            }
        }
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("failed to remove pid file: {}", e);
            }
        }
        if self.config.version_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.version_path) {
                warn!("failed to remove version file: {}", e);
            }
        }

        info!("daemon shutdown complete");
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("WAL error: {0}")]
    Wal(#[from] oj_storage::WalError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] oj_storage::SnapshotError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon: acquire the lock, load persisted state, run startup
/// recovery (§4.6), and bind the listener. The listener is bound last, so
/// no RPC traffic is accepted until recovery has finished.
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up on a lock failure: those files belong to the
            // already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    std::fs::write(
        &config.version_path,
        concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH")),
    )?;

    if let Some(parent) = config.wal_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let (mut state, processed_seq) = match Snapshot::load(&config.snapshot_path)? {
        Some(snapshot) => {
            info!(
                seq = snapshot.seq,
                containers = snapshot.state.containers.len(),
                "loaded snapshot"
            );
            (snapshot.state, snapshot.seq)
        }
        None => {
            info!("no snapshot found, starting with empty state");
            (MaterializedState::default(), 0)
        }
    };

    let event_wal = Wal::open(&config.wal_path, processed_seq)?;
    let events_to_replay = event_wal.entries_after(processed_seq)?;
    let replay_count = events_to_replay.len();
    for entry in events_to_replay {
        state.apply_event(&entry.event);
    }
    if replay_count > 0 {
        info!(count = replay_count, after_seq = processed_seq, "replayed WAL events");
    }

    let (event_bus, _event_reader) = EventBus::new(event_wal);
    let store = Store::new(Arc::new(Mutex::new(state)), event_bus);

    let mut registry: ExecutorRegistry<SystemClock> = ExecutorRegistry::new();
    register_builtins(&mut registry);
    let registry = Arc::new(registry);

    let assignments = Arc::new(ShipAssignmentManager::new(store.clone()));
    let containers = Arc::new(ContainerManager::new(
        store.clone(),
        Arc::clone(&assignments),
        registry,
        SystemClock,
    ));

    recover(&store, &containers, &assignments).await;

    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;
    set_socket_mode(&config.socket_path);

    let health = Arc::new(HealthMonitor::new(
        store.clone(),
        Arc::clone(&assignments),
        Arc::clone(&containers),
        SystemClock,
        HealthMonitorConfig {
            interval: config.health_check_interval,
            stale_assignment_timeout: config.stale_assignment_timeout,
            max_recovery_attempts: config.max_recovery_attempts,
            ..Default::default()
        },
    ));

    info!("daemon started");

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            store,
            containers,
            assignments,
            health,
            start_time: Instant::now(),
        },
        listener,
    })
}

/// Startup recovery (C6): resume `RUNNING`/`STARTING` containers, mark the
/// rest `FAILED`, and reconcile ship assignments around the outcome.
///
/// Zombie assignments (active rows pointing at containers that will not be
/// resumed) are released first, with reason `stale_cleanup`, before any
/// resumed container's assignment is created — so there is never a window
/// where a resumed container competes with its own stale assignment.
async fn recover(
    store: &Store,
    containers: &Arc<ContainerManager<SystemClock>>,
    assignments: &Arc<ShipAssignmentManager>,
) {
    let now = Utc::now();
    let candidates = store.read(|s| {
        s.containers
            .values()
            .filter(|c| matches!(c.status, oj_core::ContainerStatus::Running | oj_core::ContainerStatus::Starting))
            .cloned()
            .collect::<Vec<_>>()
    });

    let mut resumed = Vec::new();
    if !candidates.is_empty() {
        info!(count = candidates.len(), "recovering containers from persisted state");
        for container in &candidates {
            let ship_symbol = store.read(|s| {
                s.ship_assignments
                    .values()
                    .find(|a| a.is_active() && a.container_id == container.id)
                    .map(|a| a.ship_symbol.clone())
            });
            match ship_symbol {
                Some(ship_symbol) => resumed.push((container.clone(), ship_symbol)),
                None => {
                    warn!(container_id = %container.id, "no active ship assignment at recovery, marking FAILED");
                    let _ = store.apply(Event::ContainerFailed {
                        id: container.id.clone(),
                        exit_reason: "no ship assignment found at recovery".to_string(),
                        stopped_at_ms: SystemClock.epoch_ms(),
                    });
                }
            }
        }
    }

    let resumed_ids: std::collections::HashSet<String> =
        resumed.iter().map(|(c, _)| c.id.as_str().to_string()).collect();
    let zombies: Vec<String> = store.read(|s| {
        s.ship_assignments
            .values()
            .filter(|a| a.is_active() && !resumed_ids.contains(a.container_id.as_str()))
            .map(|a| a.ship_symbol.clone())
            .collect()
    });
    for ship_symbol in zombies {
        warn!(ship = %ship_symbol, "releasing zombie assignment from a container that will not resume");
        assignments.force_release(&ship_symbol, release_reason::STALE_CLEANUP, now);
    }

    for (container, ship_symbol) in resumed {
        if assignments.get(&ship_symbol).map(|a| a.is_active()).unwrap_or(false) {
            // Assignment already present and pointing here (the common case).
        } else if let Err(e) = assignments.assign(
            &ship_symbol,
            container.player_id,
            container.id.clone(),
            container.command_type.operation(),
            now,
        ) {
            warn!(container_id = %container.id, error = %e, "failed to recreate assignment at recovery");
            continue;
        }
        info!(container_id = %container.id, ship = %ship_symbol, "resuming container");
        containers.resume(container.id.clone(), container.command_type, container.config.clone());
    }
}

#[cfg(unix)]
fn set_socket_mode(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
        warn!("failed to chmod socket: {}", e);
    }
}

#[cfg(not(unix))]
fn set_socket_mode(_path: &std::path::Path) {}

fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.version_path.exists() {
        let _ = std::fs::remove_file(&config.version_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
