//! SPEC §8 scenario 4: JSON safety.
//!
//! Log messages carrying characters that are awkward to encode (quotes,
//! newlines, backslashes, astral-plane codepoints, embedded JSON-like text)
//! must still round-trip through `inspect_container` byte-identical, and
//! the overall response must parse as valid JSON.

use crate::prelude::{seed_state_dir, Daemon};
use oj_core::LogLevel;

const MESSAGES: &[&str] = &[
    r#"ship reported "low fuel" at waypoint"#,
    "line one\nline two",
    r"path is C:\ships\cooper",
    "docked at \u{1F680}",
    r#"payload looked like {"status": "ok"}"#,
];

#[test]
fn special_characters_in_logs_round_trip_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let id = oj_core::ContainerId::new("test-json-escape");

    seed_state_dir(dir.path(), |store| {
        store
            .apply(oj_core::Event::ContainerCreated {
                id: id.clone(),
                player_id: 1,
                command_type: oj_core::CommandType::NavigateShip,
                config: serde_json::json!({}),
                max_iterations: -1,
                restart_count: 0,
                created_at_ms: 0,
            })
            .unwrap();
        for (i, message) in MESSAGES.iter().enumerate() {
            store
                .apply(oj_core::Event::ContainerLogAppended {
                    container_id: id.clone(),
                    seq: i as u64 + 1,
                    level: LogLevel::Info,
                    message: message.to_string(),
                    ts_ms: 0,
                })
                .unwrap();
        }
    });

    let daemon = Daemon::spawn_in(dir);
    let response = daemon.call("inspect_container", serde_json::json!({ "container_id": id.as_str() }));
    assert!(response.get("error").is_none(), "{response:?}");

    let logs = response["result"]["logs"].as_array().unwrap();
    assert_eq!(logs.len(), MESSAGES.len());
    for (entry, expected) in logs.iter().zip(MESSAGES) {
        assert_eq!(entry["message"].as_str().unwrap(), *expected);
    }
}
