use chrono::{TimeZone, Utc};
use tempfile::tempdir;
use uuid::Uuid;

use timetrack::engine::Tracker;
use timetrack::models::{TaskTemplate, TimerStat, TrackerState};
use timetrack::storage::{JsonFileGateway, MemoryGateway, StorageGateway};

fn sample_state() -> TrackerState {
    let walk = TaskTemplate {
        id: Uuid::new_v4(),
        name: "Walk".into(),
        incompatible_group: Some("movement".into()),
        created_at: Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap(),
    };
    let think = TaskTemplate {
        id: Uuid::new_v4(),
        name: "Think".into(),
        incompatible_group: None,
        created_at: Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 1).unwrap(),
    };
    let mut stat = TimerStat::default();
    stat.daily.insert("2024-03-04".into(), 90_000);
    stat.current_start = Some(Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap());

    let mut state = TrackerState::default();
    state.active.push(walk.id);
    state.inactive.push(think.id);
    state.statistics.insert(walk.id, stat);
    state.templates.push(walk);
    state.templates.push(think);
    state
}

#[test]
fn missing_file_loads_as_none() {
    let dir = tempdir().unwrap();
    let gateway = JsonFileGateway::new(dir.path().join("tracker.json"));
    assert!(gateway.load().unwrap().is_none());
}

#[test]
fn file_gateway_round_trips_the_state() {
    let dir = tempdir().unwrap();
    let gateway = JsonFileGateway::new(dir.path().join("tracker.json"));

    let state = sample_state();
    gateway.save(&state).unwrap();
    let loaded = gateway.load().unwrap().unwrap();
    assert_eq!(loaded, state);
}

#[test]
fn corrupt_blob_errors_and_the_tracker_falls_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tracker.json");
    std::fs::write(&path, "definitely not json").unwrap();

    let gateway = JsonFileGateway::new(path.clone());
    assert!(gateway.load().is_err());

    // the engine recovers with the default empty state
    let tracker = Tracker::open(Box::new(JsonFileGateway::new(path)));
    assert!(tracker.state().templates.is_empty());
}

#[test]
fn partial_blob_fills_missing_fields_with_defaults() {
    let blob = r#"{
        "templates": [{
            "id": "7f9c2ba4-e88f-4e59-b9c1-7a11c2d9f001",
            "name": "Walk",
            "created_at": "2024-03-04T08:00:00Z"
        }]
    }"#;
    let mut state: TrackerState = serde_json::from_str(blob).unwrap();
    assert_eq!(state.templates.len(), 1);
    assert_eq!(state.templates[0].incompatible_group, None);
    assert!(state.active.is_empty());
    assert!(state.statistics.is_empty());
    assert_eq!(state.last_sync, None);

    // reconcile files the unlisted template under inactive
    state.reconcile();
    assert_eq!(state.inactive, vec![state.templates[0].id]);
}

#[test]
fn reconcile_repairs_a_corrupted_activation_partition() {
    let mut state = sample_state();
    let walk = state.templates[0].id;
    let think = state.templates[1].id;
    // corrupt: walk in both sets, think running while inactive, orphan stat
    state.inactive.push(walk);
    state
        .statistics
        .insert(think, TimerStat {
            current_start: Some(Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()),
            daily: Default::default(),
        });
    state.statistics.insert(Uuid::new_v4(), TimerStat::default());

    state.reconcile();
    assert_eq!(state.active, vec![walk]);
    assert_eq!(state.inactive, vec![think]);
    assert_eq!(state.statistics.len(), 2);
    assert!(!state.is_running(think), "archived tasks cannot be running");
    assert!(state.is_running(walk));
}

#[test]
fn memory_gateway_preserves_a_running_timer() {
    let gateway = MemoryGateway::default();
    let started = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();

    let mut tr = Tracker::open(Box::new(gateway.clone()));
    let id = tr.create_template("Walk", None).unwrap().id;
    tr.activate(id);
    tr.request_start_at(id, started);

    let reopened = Tracker::open(Box::new(gateway));
    assert!(reopened.is_running(id));
    assert_eq!(reopened.stat(id).unwrap().current_start, Some(started));
}
