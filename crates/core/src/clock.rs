// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction so executors can sleep in a way that is both
//! preemptible by cancellation and fast to drive under test.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Time source used throughout the daemon.
///
/// Production code uses [`SystemClock`]; tests drive a [`FakeClock`] so that
/// boundary scenarios (stale-assignment timeouts, health-check intervals,
/// long executor sleeps) run instantly instead of burning wall-clock time.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic instant, for measuring elapsed durations.
    fn now(&self) -> Instant;

    /// Wall-clock milliseconds since the Unix epoch, for persisted timestamps.
    fn epoch_ms(&self) -> u64;

    /// Sleep for `duration`, returning early (with `false`) if `cancel` fires first.
    /// Returns `true` if the full duration elapsed without cancellation.
    fn sleep(
        &self,
        duration: Duration,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = bool> + Send;
}

/// Real clock backed by OS time.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    async fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = cancel.cancelled() => false,
        }
    }
}

/// Deterministic clock for tests. `advance()`/`set()` move time instantly;
/// `sleep()` resolves as soon as the advanced time reaches the target,
/// without ever actually blocking the test thread.
#[derive(Clone)]
pub struct FakeClock {
    instant: Arc<Mutex<Instant>>,
    epoch_ms: Arc<AtomicU64>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            instant: Arc::new(Mutex::new(Instant::now())),
            epoch_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Move both the monotonic and epoch clocks forward by `d`.
    pub fn advance(&self, d: Duration) {
        *self.instant.lock() += d;
        self.epoch_ms.fetch_add(d.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_epoch_ms(&self, ms: u64) {
        self.epoch_ms.store(ms, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.instant.lock()
    }

    fn epoch_ms(&self) -> u64 {
        self.epoch_ms.load(Ordering::SeqCst)
    }

    async fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> bool {
        // The fake clock has no real passage of time: a "sleep" either
        // completes immediately (the caller is expected to `advance()`
        // independently when asserting elapsed-time behaviour) or is
        // preempted if the token is already cancelled.
        if cancel.is_cancelled() {
            return false;
        }
        self.advance(duration);
        true
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
