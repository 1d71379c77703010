//! Black-box specifications of the operation daemon.
//!
//! These tests spawn the compiled `ojd` binary and drive it over its real
//! JSON-RPC-over-Unix-socket wire protocol, exactly as a client would. See
//! `tests/specs/prelude.rs` for the harness.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/stop_under_delay.rs"]
mod stop_under_delay;
#[path = "specs/restart_preserves_lock.rs"]
mod restart_preserves_lock;
#[path = "specs/orphan_cleanup_on_boot.rs"]
mod orphan_cleanup_on_boot;
#[path = "specs/json_safety.rs"]
mod json_safety;
#[path = "specs/double_assignment.rs"]
mod double_assignment;
