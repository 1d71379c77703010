//! SPEC §8 scenario 2: restart preserves the ship lock.
//!
//! A failed container's ship assignment must move atomically to the
//! restarted container's new identity — never left dangling on the dead id,
//! never briefly unassigned.

use crate::prelude::{seed_state_dir, Daemon};

#[test]
fn restart_moves_the_assignment_to_the_new_id() {
    let dir = tempfile::tempdir().unwrap();
    let old_id = oj_core::ContainerId::new("scout-tour-cooper-6-85834fb5");

    seed_state_dir(dir.path(), |store| {
        store
            .apply(oj_core::Event::ContainerCreated {
                id: old_id.clone(),
                player_id: 7,
                command_type: oj_core::CommandType::ScoutTour,
                config: serde_json::json!({}),
                max_iterations: -1,
                restart_count: 0,
                created_at_ms: 0,
            })
            .unwrap();
        store.apply(oj_core::Event::ContainerStarting { id: old_id.clone() }).unwrap();
        store
            .apply(oj_core::Event::ContainerStarted {
                id: old_id.clone(),
                started_at_ms: 0,
            })
            .unwrap();
        store
            .apply(oj_core::Event::ContainerFailed {
                id: old_id.clone(),
                exit_reason: "simulated executor crash".to_string(),
                stopped_at_ms: 0,
            })
            .unwrap();
        store
            .apply(oj_core::Event::ShipAssigned {
                ship_symbol: "COOPER-6".to_string(),
                player_id: 7,
                container_id: old_id.clone(),
                operation: "scout-tour".to_string(),
                assigned_at_ms: 0,
            })
            .unwrap();
    });

    let daemon = Daemon::spawn_in(dir);

    let restart = daemon.call(
        "restart_container",
        serde_json::json!({ "container_id": old_id.as_str() }),
    );
    assert!(restart.get("error").is_none(), "{restart:?}");
    let new_id = restart["result"]["container_id"].as_str().unwrap().to_string();
    assert_ne!(new_id, old_id.as_str());
    assert!(new_id.starts_with("scout-tour-cooper-6-"));

    // The lock no longer recognises the old id: a second restart attempt on
    // it can't find an active assignment to carry over.
    let second_restart_on_old = daemon.call(
        "restart_container",
        serde_json::json!({ "container_id": old_id.as_str() }),
    );
    assert!(second_restart_on_old.get("error").is_some());

    // COOPER-6 is still exclusively locked, now to the new container: a
    // fresh create for the same ship is rejected.
    let conflicting_create = daemon.call(
        "container.create",
        serde_json::json!({
            "player_id": 7,
            "config": {
                "command_type": "scout_tour",
                "ship_symbol": "COOPER-6",
                "params": {},
            },
        }),
    );
    let error = conflicting_create["error"]["message"].as_str().unwrap();
    assert_eq!(error, "ship is already assigned to another container");
}
