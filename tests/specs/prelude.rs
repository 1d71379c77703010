//! Test helpers for black-box specifications of the operation daemon.
//!
//! These tests spawn the compiled `ojd` binary against an isolated state
//! directory and drive it over its real JSON-RPC-over-Unix-socket wire
//! protocol, exactly as a client would.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Returns the path to the `ojd` binary, checking llvm-cov's target
/// directory first so coverage runs pick up the instrumented build.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

fn ojd_binary() -> PathBuf {
    binary_path("ojd")
}

/// A running `ojd` process bound to a private, temporary state directory.
pub struct Daemon {
    child: Child,
    state_dir: tempfile::TempDir,
}

impl Daemon {
    /// Spawn `ojd` with a fresh, empty state directory and wait for it to
    /// print `READY` on stdout (signalling the socket is bound and the
    /// listener task has been spawned).
    pub fn spawn() -> Self {
        Self::spawn_in(tempfile::tempdir().unwrap())
    }

    /// Spawn `ojd` against a caller-provided state directory, e.g. one
    /// pre-seeded with WAL/snapshot state to exercise startup recovery.
    pub fn spawn_in(state_dir: tempfile::TempDir) -> Self {
        let mut child = Command::new(ojd_binary())
            .env("OPD_STATE_DIR", state_dir.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("ojd should start");

        let stdout = child.stdout.take().expect("piped stdout");
        let mut reader = std::io::BufReader::new(stdout);
        wait_for_ready(&mut reader);
        // Keep draining stdout in the background so the child never blocks
        // on a full pipe buffer.
        std::thread::spawn(move || {
            use std::io::BufRead;
            let mut lines = reader.lines();
            while lines.next().is_some() {}
        });

        Self { child, state_dir }
    }

    pub fn state_dir(&self) -> &Path {
        self.state_dir.path()
    }

    pub fn socket_path(&self) -> PathBuf {
        self.state_dir.path().join("daemon.sock")
    }

    /// Send one JSON-RPC request over a fresh connection and return the
    /// decoded response body (the full `{jsonrpc,id,result|error}` object).
    pub fn call(&self, method: &str, params: serde_json::Value) -> serde_json::Value {
        self.call_with_id(method, params, serde_json::json!(1))
    }

    pub fn call_with_id(
        &self,
        method: &str,
        params: serde_json::Value,
        id: serde_json::Value,
    ) -> serde_json::Value {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let mut stream = connect(&self.socket_path());
        stream.write_all(&serde_json::to_vec(&request).unwrap()).unwrap();
        stream.shutdown(std::net::Shutdown::Write).unwrap();

        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).unwrap();
        serde_json::from_slice(&buf).expect("response should be valid JSON")
    }

    /// Poll `inspect_container` until `pred` holds on the result, or panic
    /// after `timeout`.
    pub fn wait_for_status(&self, container_id: &str, pred: impl Fn(&str) -> bool, timeout: Duration) -> serde_json::Value {
        let deadline = Instant::now() + timeout;
        loop {
            let response = self.call("inspect_container", serde_json::json!({ "container_id": container_id }));
            if let Some(result) = response.get("result") {
                if let Some(status) = result.get("status").and_then(|s| s.as_str()) {
                    if pred(status) {
                        return result.clone();
                    }
                }
            }
            if Instant::now() > deadline {
                panic!("status predicate for {container_id} never became true; last response: {response}");
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }
}

fn connect(socket_path: &Path) -> UnixStream {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        match UnixStream::connect(socket_path) {
            Ok(stream) => return stream,
            Err(e) if Instant::now() < deadline => {
                let _ = e;
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(e) => panic!("failed to connect to {}: {e}", socket_path.display()),
        }
    }
}

fn wait_for_ready(reader: &mut impl std::io::BufRead) {
    let mut line = String::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => panic!("ojd exited before printing READY"),
            Ok(_) => {
                if line.trim() == "READY" {
                    return;
                }
            }
            Err(e) => panic!("failed reading ojd stdout: {e}"),
        }
        if Instant::now() > deadline {
            panic!("ojd did not print READY within the startup deadline");
        }
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = Command::new("kill")
            .args(["-TERM", &self.child.id().to_string()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        let _ = self.child.wait();
    }
}

/// Write a WAL + snapshot directly (no running daemon) so a test can seed
/// persisted state before startup recovery runs, exactly the scenario
/// recovery is meant to resolve.
pub fn seed_state_dir(state_dir: &Path, seed: impl FnOnce(&oj_engine::Store)) {
    let wal_path = state_dir.join("wal").join("events.wal");
    std::fs::create_dir_all(wal_path.parent().unwrap()).unwrap();
    let wal = oj_storage::Wal::open(&wal_path, 0).unwrap();
    let (bus, _reader) = oj_storage::EventBus::new(wal);
    let store = oj_engine::Store::new(
        std::sync::Arc::new(parking_lot::Mutex::new(oj_storage::MaterializedState::default())),
        bus,
    );
    seed(&store);
    store.event_bus().flush().unwrap();
    let seq = store.event_bus().processed_seq();
    let state_clone = store.read(|s| s.clone());
    oj_storage::Snapshot::new(seq, state_clone)
        .save(&state_dir.join("snapshot.json"))
        .unwrap();
}
