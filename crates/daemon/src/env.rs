// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.
//!
//! Every `OPD_*` variable is read once, here, at `Config::load()` time; see
//! `lifecycle::Config`. None are hot-reloaded.

use std::path::PathBuf;
use std::time::Duration;

/// State directory: `OPD_STATE_DIR`, else `<cwd>/var`.
pub fn state_dir() -> PathBuf {
    std::env::var("OPD_STATE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_default().join("var"))
}

/// Socket path: `OPD_SOCKET_PATH`, else `<state_dir>/daemon.sock`.
pub fn socket_path(state_dir: &std::path::Path) -> PathBuf {
    std::env::var("OPD_SOCKET_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| state_dir.join("daemon.sock"))
}

fn duration_secs(var: &str, default_secs: u64) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default_secs))
}

/// Health-check interval: `OPD_HEALTH_CHECK_INTERVAL_SECS`, default 60s.
pub fn health_check_interval() -> Duration {
    duration_secs("OPD_HEALTH_CHECK_INTERVAL_SECS", 60)
}

/// Stale-assignment timeout: `OPD_STALE_ASSIGNMENT_TIMEOUT_SECS`, default 30min.
pub fn stale_assignment_timeout() -> chrono::Duration {
    let secs = duration_secs("OPD_STALE_ASSIGNMENT_TIMEOUT_SECS", 30 * 60).as_secs();
    chrono::Duration::seconds(secs as i64)
}

/// Maximum health-monitor recovery attempts before abandoning a container:
/// `OPD_MAX_RECOVERY_ATTEMPTS`, default 5.
pub fn max_recovery_attempts() -> u32 {
    std::env::var("OPD_MAX_RECOVERY_ATTEMPTS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(5)
}

/// RPC handler timeout: `OPD_REQUEST_TIMEOUT_SECS`, default 10s.
pub fn request_timeout() -> Duration {
    duration_secs("OPD_REQUEST_TIMEOUT_SECS", 10)
}

/// Shutdown grace period: `OPD_SHUTDOWN_GRACE_SECS`, default 30s.
pub fn shutdown_grace() -> Duration {
    duration_secs("OPD_SHUTDOWN_GRACE_SECS", 30)
}
