use super::*;
use crate::container::CommandType;

#[test]
fn container_created_round_trips_through_json() {
    let event = Event::ContainerCreated {
        id: ContainerId::new("navigate-SCOUT-1-deadbeef"),
        player_id: 1,
        command_type: CommandType::NavigateShip,
        config: serde_json::json!({"destination": "X1-AB12"}),
        max_iterations: 1,
        restart_count: 0,
        created_at_ms: 1_000,
    };
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("\"type\":\"container:created\""));
    let parsed: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.name(), "container:created");
}

#[test]
fn container_created_without_restart_count_field_defaults_to_zero() {
    let json = r#"{"type":"container:created","id":"navigate-SCOUT-1-deadbeef","player_id":1,"command_type":"navigate_ship","config":{},"max_iterations":1,"created_at_ms":1000}"#;
    let parsed: Event = serde_json::from_str(json).unwrap();
    match parsed {
        Event::ContainerCreated { restart_count, .. } => assert_eq!(restart_count, 0),
        _ => panic!("expected ContainerCreated"),
    }
}

#[test]
fn shutdown_has_no_extra_fields() {
    let json = serde_json::to_string(&Event::Shutdown).unwrap();
    assert_eq!(json, "{\"type\":\"system:shutdown\"}");
}

#[test]
fn log_summary_includes_ids() {
    let event = Event::ShipAssigned {
        ship_symbol: "COOPER-6".into(),
        player_id: 1,
        container_id: ContainerId::new("navigate-COOPER-6-deadbeef"),
        operation: "navigate".into(),
        assigned_at_ms: 1_000,
    };
    let summary = event.log_summary();
    assert!(summary.contains("COOPER-6"));
    assert!(summary.contains("navigate-COOPER-6-deadbeef"));
}

#[test]
fn event_names_are_namespaced() {
    assert_eq!(
        Event::ContainerRemoved {
            id: ContainerId::new("x")
        }
        .name(),
        "container:removed"
    );
    assert_eq!(
        Event::ShipReleased {
            ship_symbol: "x".into(),
            reason: "manual".into(),
            released_at_ms: 0,
        }
        .name(),
        "ship:released"
    );
}
