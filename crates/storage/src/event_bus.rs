// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus wrapping the WAL with group-commit buffering and a wake signal.
//!
//! Writers call `send` to durably queue an event (buffered, not yet
//! fsynced); `flush` is the durability point. A `wake_tx`/`wake_rx` pair lets
//! a reader block efficiently between wakeups rather than polling.

use oj_core::Event;
use std::sync::Arc;

use crate::{Wal, WalEntry, WalError};
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Handle for appending events to the WAL.
#[derive(Clone)]
pub struct EventBus {
    wal: Arc<Mutex<Wal>>,
    wake_tx: mpsc::Sender<()>,
}

/// Handle for draining unprocessed WAL entries, e.g. during startup replay.
pub struct EventReader {
    wal: Arc<Mutex<Wal>>,
    wake_rx: mpsc::Receiver<()>,
}

impl EventBus {
    /// Wrap a WAL, returning both the sender and reader halves.
    pub fn new(wal: Wal) -> (Self, EventReader) {
        let wal = Arc::new(Mutex::new(wal));
        let (wake_tx, wake_rx) = mpsc::channel(1);

        (
            Self {
                wal: Arc::clone(&wal),
                wake_tx,
            },
            EventReader { wal, wake_rx },
        )
    }

    /// Append an event to the WAL (buffered, not yet durable).
    ///
    /// Returns the assigned sequence number.
    pub fn send(&self, event: &Event) -> Result<u64, WalError> {
        let seq = {
            let mut wal = self.wal.lock();
            wal.append(event)?
        };
        let _ = self.wake_tx.try_send(());
        Ok(seq)
    }

    /// Flush the WAL to disk with a single fsync.
    pub fn flush(&self) -> Result<(), WalError> {
        self.wal.lock().flush()
    }

    /// Whether the WAL's buffer is due a flush (interval elapsed or full).
    pub fn needs_flush(&self) -> bool {
        self.wal.lock().needs_flush()
    }

    /// Highest WAL sequence number marked processed so far.
    pub fn processed_seq(&self) -> u64 {
        self.wal.lock().processed_seq()
    }

    /// Clone of the underlying WAL handle, for checkpoint/truncate callers.
    pub fn wal(&self) -> Arc<Mutex<Wal>> {
        Arc::clone(&self.wal)
    }
}

impl EventReader {
    /// Wait for and return the next unprocessed entry, or `None` once every
    /// `EventBus` sender has been dropped.
    pub async fn recv(&mut self) -> Result<Option<WalEntry>, WalError> {
        loop {
            {
                let mut wal = self.wal.lock();
                if let Some(entry) = wal.next_unprocessed()? {
                    return Ok(Some(entry));
                }
            }
            if self.wake_rx.recv().await.is_none() {
                return Ok(None);
            }
        }
    }

    /// Mark an entry as processed (in memory; durability comes from snapshots).
    pub fn mark_processed(&self, seq: u64) {
        self.wal.lock().mark_processed(seq);
    }

    /// Clone of the underlying WAL handle.
    pub fn wal(&self) -> Arc<Mutex<Wal>> {
        Arc::clone(&self.wal)
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
