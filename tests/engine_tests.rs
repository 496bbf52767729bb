use chrono::{Duration, TimeZone, Utc};
use timetrack::engine::{StartOutcome, Tracker};
use timetrack::error::TrackerError;
use timetrack::stats::date_key;
use timetrack::storage::MemoryGateway;

fn tracker() -> Tracker {
    Tracker::open(Box::new(MemoryGateway::default()))
}

/// Every template id must sit in exactly one of active/inactive.
fn assert_partition(tracker: &Tracker) {
    let state = tracker.state();
    for t in &state.templates {
        let in_active = state.active.contains(&t.id);
        let in_inactive = state.inactive.contains(&t.id);
        assert!(
            in_active ^ in_inactive,
            "task '{}' must be in exactly one activation set",
            t.name
        );
    }
    assert_eq!(
        state.active.len() + state.inactive.len(),
        state.templates.len()
    );
}

#[test]
fn new_task_starts_inactive() {
    let mut tr = tracker();
    let id = tr.create_template("Read", None).unwrap().id;
    assert!(tr.state().inactive.contains(&id));
    assert!(!tr.state().active.contains(&id));
    assert_partition(&tr);
}

#[test]
fn blank_name_is_rejected() {
    let mut tr = tracker();
    let err = tr.create_template("   ", None).unwrap_err();
    assert!(matches!(err, TrackerError::Validation(_)));
    assert!(tr.state().templates.is_empty());
}

#[test]
fn activation_partition_survives_any_sequence() {
    let mut tr = tracker();
    let a = tr.create_template("A", None).unwrap().id;
    let b = tr.create_template("B", Some("g")).unwrap().id;
    let unknown = uuid::Uuid::new_v4();

    tr.activate(a);
    assert_partition(&tr);
    tr.activate(a); // already active: no-op
    assert_partition(&tr);
    tr.activate(unknown); // unknown id: no-op
    assert_partition(&tr);
    tr.deactivate(a);
    assert_partition(&tr);
    tr.deactivate(a); // already inactive: no-op
    assert_partition(&tr);
    tr.activate(b);
    tr.delete_template(a).unwrap();
    assert_partition(&tr);
    assert_eq!(tr.state().templates.len(), 1);
}

#[test]
fn conflicting_start_requires_confirmation() {
    // Scenario: "Walk" and "Run" share the movement group.
    let mut tr = tracker();
    let walk = tr.create_template("Walk", Some("movement")).unwrap().id;
    let run = tr.create_template("Run", Some("movement")).unwrap().id;
    tr.activate(walk);
    tr.activate(run);

    let t0 = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
    assert_eq!(tr.request_start_at(walk, t0), StartOutcome::Started);
    assert!(tr.is_running(walk));
    assert!(tr.stat(walk).unwrap().daily.is_empty());

    let t1 = t0 + Duration::milliseconds(5_000);
    let outcome = tr.request_start_at(run, t1);
    let StartOutcome::PendingConfirmation { conflicting } = outcome else {
        panic!("expected a pending confirmation, got {:?}", outcome);
    };
    assert_eq!(conflicting, vec![walk]);
    // nothing moved while the decision is pending
    assert!(tr.is_running(walk));
    assert!(!tr.is_running(run));

    tr.confirm_start_at(run, &conflicting, t1);
    assert!(!tr.is_running(walk));
    assert!(tr.is_running(run));
    assert_eq!(
        tr.stat(walk).unwrap().daily.get(&date_key(t1)),
        Some(&5_000)
    );
}

#[test]
fn declining_a_pending_start_changes_nothing() {
    let mut tr = tracker();
    let walk = tr.create_template("Walk", Some("movement")).unwrap().id;
    let run = tr.create_template("Run", Some("movement")).unwrap().id;
    tr.activate(walk);
    tr.activate(run);

    let t0 = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
    tr.request_start_at(walk, t0);
    let revision = tr.revision();
    let outcome = tr.request_start_at(run, t0 + Duration::seconds(1));
    assert!(matches!(outcome, StartOutcome::PendingConfirmation { .. }));
    tr.cancel_start();

    assert!(tr.is_running(walk));
    assert!(!tr.is_running(run));
    assert_eq!(tr.revision(), revision, "a declined start must not mutate");
}

#[test]
fn stopped_group_member_does_not_conflict() {
    let mut tr = tracker();
    let walk = tr.create_template("Walk", Some("movement")).unwrap().id;
    let run = tr.create_template("Run", Some("movement")).unwrap().id;
    tr.activate(walk);
    tr.activate(run);
    // Walk is active but its timer never started
    assert_eq!(tr.request_start(run), StartOutcome::Started);
    assert!(tr.is_running(run));
}

#[test]
fn groupless_tasks_never_conflict() {
    let mut tr = tracker();
    let walk = tr.create_template("Walk", Some("movement")).unwrap().id;
    let think = tr.create_template("Think", None).unwrap().id;
    tr.activate(walk);
    tr.activate(think);
    assert_eq!(tr.request_start(walk), StartOutcome::Started);
    assert_eq!(tr.request_start(think), StartOutcome::Started);
    assert!(tr.is_running(walk));
    assert!(tr.is_running(think));
}

#[test]
fn starting_an_unknown_task_is_a_silent_noop() {
    let mut tr = tracker();
    assert_eq!(tr.request_start(uuid::Uuid::new_v4()), StartOutcome::UnknownTask);
    assert!(tr.state().statistics.is_empty());
}

#[test]
fn stop_accumulates_elapsed_time_into_today() {
    // Scenario: "Think" runs for 90 000 ms.
    let mut tr = tracker();
    let think = tr.create_template("Think", None).unwrap().id;
    tr.activate(think);

    let t0 = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
    tr.request_start_at(think, t0);
    let t1 = t0 + Duration::milliseconds(90_000);
    tr.stop_at(think, t1);

    let stat = tr.stat(think).unwrap();
    assert_eq!(stat.current_start, None);
    assert_eq!(stat.daily.get(&date_key(t1)), Some(&90_000));
}

#[test]
fn stop_then_start_never_loses_time() {
    let mut tr = tracker();
    let id = tr.create_template("Write", None).unwrap().id;
    tr.activate(id);

    let t0 = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
    tr.request_start_at(id, t0);
    let t1 = t0 + Duration::milliseconds(60_000);
    tr.stop_at(id, t1);
    let before = *tr.stat(id).unwrap().daily.get(&date_key(t1)).unwrap();

    // a new, non-overlapping session
    tr.request_start_at(id, t1);
    let t2 = t1 + Duration::milliseconds(30_000);
    tr.stop_at(id, t2);

    let after = *tr.stat(id).unwrap().daily.get(&date_key(t2)).unwrap();
    assert_eq!(after, before + 30_000);
}

#[test]
fn stopping_a_stopped_task_is_a_noop() {
    let mut tr = tracker();
    let id = tr.create_template("Idle", None).unwrap().id;
    tr.activate(id);
    tr.stop(id); // no stat record at all
    assert!(tr.stat(id).is_none());

    let t0 = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
    tr.request_start_at(id, t0);
    tr.stop_at(id, t0 + Duration::seconds(1));
    let daily = tr.stat(id).unwrap().daily.clone();
    tr.stop_at(id, t0 + Duration::seconds(30));
    assert_eq!(tr.stat(id).unwrap().daily, daily);
}

#[test]
fn deactivate_stops_a_running_timer_first() {
    let mut tr = tracker();
    let id = tr.create_template("Walk", Some("movement")).unwrap().id;
    tr.activate(id);

    let t0 = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
    tr.request_start_at(id, t0);
    let t1 = t0 + Duration::milliseconds(12_000);
    tr.deactivate_at(id, t1);

    assert!(!tr.is_running(id), "no live timer may reach the archive");
    assert!(tr.state().inactive.contains(&id));
    assert_eq!(tr.stat(id).unwrap().daily.get(&date_key(t1)), Some(&12_000));
    assert_partition(&tr);
}

#[test]
fn starting_an_archived_task_repairs_membership() {
    let mut tr = tracker();
    let id = tr.create_template("Stray", None).unwrap().id;
    // never activated; a start should pull it into the working list
    assert_eq!(tr.request_start(id), StartOutcome::Started);
    assert!(tr.state().active.contains(&id));
    assert!(!tr.state().inactive.contains(&id));
    assert_partition(&tr);
}

#[test]
fn deleting_an_active_task_fails_without_mutation() {
    let mut tr = tracker();
    let id = tr.create_template("Busy", None).unwrap().id;
    tr.activate(id);

    let err = tr.delete_template(id).unwrap_err();
    assert!(matches!(err, TrackerError::InvalidState(_)));
    assert!(tr.template(id).is_some());
    assert!(tr.state().active.contains(&id));
    assert_partition(&tr);
}

#[test]
fn deleting_removes_template_and_statistics() {
    let mut tr = tracker();
    let id = tr.create_template("Done", None).unwrap().id;
    tr.activate(id);
    let t0 = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
    tr.request_start_at(id, t0);
    tr.stop_at(id, t0 + Duration::seconds(5));
    tr.deactivate(id);

    tr.delete_template(id).unwrap();
    assert!(tr.template(id).is_none());
    assert!(tr.stat(id).is_none());
    assert_partition(&tr);
}

#[test]
fn deleting_an_unknown_task_reports_not_found() {
    let mut tr = tracker();
    let err = tr.delete_template(uuid::Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, TrackerError::NotFound(_)));
}

#[test]
fn defaults_seed_once_and_only_when_empty() {
    let mut tr = tracker();
    tr.ensure_defaults();

    let state = tr.state();
    assert_eq!(state.templates.len(), 4);
    assert!(state.active.is_empty());
    assert_eq!(state.inactive.len(), 4);
    let movement = state
        .templates
        .iter()
        .filter(|t| t.incompatible_group.as_deref() == Some("movement"))
        .count();
    assert_eq!(movement, 2);

    tr.ensure_defaults();
    assert_eq!(tr.state().templates.len(), 4, "seeding must not repeat");
}

#[test]
fn state_round_trips_through_the_gateway() {
    let gateway = MemoryGateway::default();
    let mut tr = Tracker::open(Box::new(gateway.clone()));
    let walk = tr.create_template("Walk", Some("movement")).unwrap().id;
    let think = tr.create_template("Think", None).unwrap().id;
    tr.activate(walk);
    tr.activate(think);

    let t0 = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
    tr.request_start_at(think, t0);
    tr.stop_at(think, t0 + Duration::milliseconds(90_000));
    tr.request_start_at(walk, t0);

    let reopened = Tracker::open(Box::new(gateway));
    assert_eq!(reopened.state(), tr.state());
    // a running timer survives the round-trip untouched
    assert_eq!(
        reopened.stat(walk).unwrap().current_start,
        Some(t0)
    );
}

#[test]
fn reload_picks_up_another_writer() {
    let gateway = MemoryGateway::default();
    let mut a = Tracker::open(Box::new(gateway.clone()));
    let mut b = Tracker::open(Box::new(gateway));

    let id = b.create_template("Shared", None).unwrap().id;
    assert!(a.template(id).is_none());

    let revision = a.revision();
    a.reload();
    assert!(a.template(id).is_some());
    assert!(a.revision() > revision);

    // a second reload with no upstream change leaves the revision alone
    let revision = a.revision();
    a.reload();
    assert_eq!(a.revision(), revision);
}

#[test]
fn every_mutation_bumps_the_revision() {
    let mut tr = tracker();
    let r0 = tr.revision();
    let id = tr.create_template("Tick", None).unwrap().id;
    let r1 = tr.revision();
    assert!(r1 > r0);
    tr.activate(id);
    let r2 = tr.revision();
    assert!(r2 > r1);
    tr.request_start(id);
    assert!(tr.revision() > r2);
}
