//! SPEC §8 scenario 1: stop under delay.
//!
//! A container whose executor sleeps for 369 seconds must still come down
//! within a couple of seconds of `stop_container` — the stop contract
//! forbids waiting out the in-flight sleep.

use crate::prelude::Daemon;
use std::time::{Duration, Instant};

#[test]
fn stop_under_delay_completes_in_two_seconds() {
    let daemon = Daemon::spawn();

    let create = daemon.call(
        "container.create",
        serde_json::json!({
            "player_id": 1,
            "config": {
                "command_type": "navigate_ship",
                "ship_symbol": "DELAY-1",
                "params": {"duration_secs": 369},
            },
        }),
    );
    let container_id = create["result"]["container_id"].as_str().unwrap().to_string();

    let stop_started = Instant::now();
    let stop = daemon.call("stop_container", serde_json::json!({ "container_id": container_id }));
    assert!(stop.get("error").is_none(), "{stop:?}");
    assert_eq!(stop["result"]["ok"], serde_json::json!(true));

    let detail = daemon.wait_for_status(&container_id, |s| s == "STOPPED", Duration::from_millis(2500));
    assert!(
        stop_started.elapsed() < Duration::from_secs(3),
        "stop took {:?}, expected well under the 369s sleep",
        stop_started.elapsed()
    );
    assert_eq!(detail["status"], serde_json::json!("STOPPED"));
}
