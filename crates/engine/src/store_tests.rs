use super::*;
use oj_core::ContainerId;
use oj_storage::Wal;
use std::sync::Arc;
use tempfile::tempdir;

fn created_event(id: &str) -> Event {
    Event::ContainerCreated {
        id: ContainerId::new(id),
        player_id: 1,
        command_type: oj_core::CommandType::NavigateShip,
        config: serde_json::json!({}),
        max_iterations: 1,
        restart_count: 0,
        created_at_ms: 0,
    }
}

fn test_store() -> (Store, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let wal = Wal::open(&dir.path().join("wal.jsonl"), 0).unwrap();
    let (bus, _reader) = EventBus::new(wal);
    let store = Store::new(Arc::new(Mutex::new(MaterializedState::default())), bus);
    (store, dir)
}

#[test]
fn apply_updates_state_and_assigns_a_wal_seq() {
    let (store, _dir) = test_store();

    let seq = store.apply(created_event("c-1")).unwrap();
    assert_eq!(seq, 1);
    assert!(store.read(|s| s.containers.contains_key("c-1")));
}

#[test]
fn read_sees_the_latest_applied_state() {
    let (store, _dir) = test_store();
    store.apply(created_event("c-1")).unwrap();
    store.apply(created_event("c-2")).unwrap();

    assert_eq!(store.read(|s| s.containers.len()), 2);
}
