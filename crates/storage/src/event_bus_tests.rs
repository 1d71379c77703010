use super::*;
use oj_core::ContainerId;
use tempfile::tempdir;

fn sample_event() -> Event {
    Event::ContainerCreated {
        id: ContainerId::new("navigate-SCOUT-1-deadbeef"),
        player_id: 1,
        command_type: oj_core::CommandType::NavigateShip,
        config: serde_json::json!({}),
        max_iterations: 1,
        restart_count: 0,
        created_at_ms: 0,
    }
}

#[tokio::test]
async fn send_then_recv_delivers_in_order() {
    let dir = tempdir().unwrap();
    let wal = Wal::open(&dir.path().join("wal.jsonl"), 0).unwrap();
    let (bus, mut reader) = EventBus::new(wal);

    bus.send(&sample_event()).unwrap();
    let entry = reader.recv().await.unwrap().unwrap();
    assert_eq!(entry.seq, 1);
    reader.mark_processed(entry.seq);

    assert_eq!(bus.processed_seq(), 1);
}

#[tokio::test]
async fn recv_returns_none_once_every_sender_is_dropped() {
    let dir = tempdir().unwrap();
    let wal = Wal::open(&dir.path().join("wal.jsonl"), 0).unwrap();
    let (bus, mut reader) = EventBus::new(wal);
    drop(bus);

    assert!(reader.recv().await.unwrap().is_none());
}

#[tokio::test]
async fn flush_makes_entries_durable_without_waiting_on_threshold() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");
    let wal = Wal::open(&path, 0).unwrap();
    let (bus, _reader) = EventBus::new(wal);

    bus.send(&sample_event()).unwrap();
    bus.flush().unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 1);
}
