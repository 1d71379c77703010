//! SPEC §8 scenario 5: double assignment.
//!
//! Once a ship is bound to a container, a second `container.create` for the
//! same ship must be rejected and the ship must remain bound to the first.

use crate::prelude::Daemon;

#[test]
fn second_create_for_an_already_assigned_ship_is_rejected() {
    let daemon = Daemon::spawn();

    let first = daemon.call(
        "container.create",
        serde_json::json!({
            "container_id": "container-1",
            "player_id": 1,
            "config": {
                "command_type": "navigate_ship",
                "ship_symbol": "TEST-1",
                "params": {"duration_secs": 60},
            },
        }),
    );
    assert!(first.get("error").is_none(), "{first:?}");
    assert_eq!(first["result"]["container_id"], serde_json::json!("container-1"));

    let second = daemon.call(
        "container.create",
        serde_json::json!({
            "container_id": "container-2",
            "player_id": 1,
            "config": {
                "command_type": "navigate_ship",
                "ship_symbol": "TEST-1",
                "params": {"duration_secs": 60},
            },
        }),
    );
    let error = second["error"]["message"].as_str().unwrap();
    assert_eq!(error, "ship is already assigned to another container");

    // TEST-1 is still on container-1: stopping it (the only one that should
    // exist) must succeed, and a fresh inspect of container-2 must 404.
    let stop = daemon.call("stop_container", serde_json::json!({ "container_id": "container-1" }));
    assert!(stop.get("error").is_none(), "{stop:?}");

    let inspect_second = daemon.call("inspect_container", serde_json::json!({ "container_id": "container-2" }));
    assert!(inspect_second.get("error").is_some());
}
