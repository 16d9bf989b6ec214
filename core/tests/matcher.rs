//! Auto-assignment matcher tests: city filter, profession compatibility,
//! deterministic tie-break, and the no-match outcome.

use chrono::{DateTime, TimeZone, Utc};
use civicdesk_core::{
    clock::ManualClock,
    complaint::{Complaint, ComplaintCategory, ComplaintDraft, ComplaintStatus, Location},
    config::EngineConfig,
    engine::{LifecycleEngine, AUTO_ASSIGN_ACTOR},
    notify::{NotificationKind, RecordingNotifier},
    staff::{Profession, StaffProfile},
    store::DeskStore,
};
use std::sync::Arc;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
}

fn build_engine() -> (LifecycleEngine, Arc<RecordingNotifier>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = DeskStore::in_memory().unwrap();
    store.migrate().unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = LifecycleEngine::new(
        store,
        EngineConfig::default(),
        Arc::new(ManualClock::new(start())),
        notifier.clone(),
    );
    (engine, notifier)
}

fn add_staff(engine: &LifecycleEngine, id: &str, profession: Profession, city: &str) {
    engine
        .store()
        .insert_staff(&StaffProfile {
            staff_id: id.to_string(),
            full_name: id.to_string(),
            profession,
            city: city.to_string(),
        })
        .unwrap();
}

fn water_leak_in(engine: &LifecycleEngine, city: &str) -> Complaint {
    engine
        .create_and_maybe_assign(ComplaintDraft {
            title: "Water pooling under the overpass".to_string(),
            description: "Steady leak from a cracked main".to_string(),
            category: ComplaintCategory::WaterLeakage,
            priority: None,
            reporter_id: Some("reporter-1".to_string()),
            location: Location::city(city),
            sla_hours: None,
        })
        .unwrap()
}

/// A Water Leakage complaint in Wondervale with a Plumber and an Electrician
/// in the same city routes to the Plumber.
#[test]
fn water_leak_routes_to_the_plumber() {
    let (engine, notifier) = build_engine();
    add_staff(&engine, "electrician-wv", Profession::Electrician, "Wondervale");
    add_staff(&engine, "plumber-wv", Profession::Plumber, "Wondervale");

    let c = water_leak_in(&engine, "Wondervale");
    assert_eq!(c.assigned_to.as_deref(), Some("plumber-wv"));
    assert_eq!(c.status, ComplaintStatus::InProgress);

    // Assignment is audited with the system acting identity, and the new
    // assignee is notified.
    let assignments = engine.store().assignment_history(&c.complaint_id).unwrap();
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].assigned_to, "plumber-wv");
    assert_eq!(assignments[0].actor, AUTO_ASSIGN_ACTOR);

    let assigned = notifier.sent_of_kind(NotificationKind::Assigned);
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].0, vec!["plumber-wv".to_string()]);
}

/// Staff in other cities never qualify, however well their profession fits.
#[test]
fn no_staff_in_city_means_no_assignment() {
    let (engine, notifier) = build_engine();
    add_staff(&engine, "plumber-nb", Profession::Plumber, "Northbay");

    let c = water_leak_in(&engine, "Wondervale");
    assert_eq!(c.assigned_to, None);
    assert_eq!(c.status, ComplaintStatus::Open);
    assert!(notifier.sent().is_empty());
    assert!(engine
        .store()
        .assignment_history(&c.complaint_id)
        .unwrap()
        .is_empty());
}

/// City comparison is case-insensitive.
#[test]
fn city_match_ignores_case() {
    let (engine, _notifier) = build_engine();
    add_staff(&engine, "plumber-wv", Profession::Plumber, "WONDERVALE");

    let c = water_leak_in(&engine, "wondervale");
    assert_eq!(c.assigned_to.as_deref(), Some("plumber-wv"));
}

/// Among several compatible candidates the first in directory order wins.
#[test]
fn tie_break_is_first_in_directory_order() {
    let (engine, _notifier) = build_engine();
    add_staff(&engine, "plumber-a", Profession::Plumber, "Wondervale");
    add_staff(&engine, "plumber-b", Profession::Plumber, "Wondervale");

    let c = water_leak_in(&engine, "Wondervale");
    assert_eq!(c.assigned_to.as_deref(), Some("plumber-a"));
}

/// A compatible profession in the right city is required — a Cleaner does not
/// pick up a water leak even when alone in the city.
#[test]
fn incompatible_profession_stays_unassigned() {
    let (engine, _notifier) = build_engine();
    add_staff(&engine, "cleaner-wv", Profession::Cleaner, "Wondervale");

    let c = water_leak_in(&engine, "Wondervale");
    assert_eq!(c.assigned_to, None);
    assert_eq!(c.status, ComplaintStatus::Open);
}

/// The keyword table is injected configuration: an operator can extend a
/// profession's reach without touching the matcher.
#[test]
fn keyword_table_is_swappable() {
    let store = DeskStore::in_memory().unwrap();
    store.migrate().unwrap();
    let mut config = EngineConfig::default();
    config
        .profession_keywords
        .get_mut(&Profession::Cleaner)
        .unwrap()
        .push("graffiti".to_string());
    let engine = LifecycleEngine::new(
        store,
        config,
        Arc::new(ManualClock::new(start())),
        Arc::new(RecordingNotifier::default()),
    );
    add_staff(&engine, "cleaner-wv", Profession::Cleaner, "Wondervale");

    let c = engine
        .create_and_maybe_assign(ComplaintDraft {
            title: "Tags on the underpass".to_string(),
            description: "Fresh graffiti on the east wall".to_string(),
            category: ComplaintCategory::Graffiti,
            priority: None,
            reporter_id: None,
            location: Location::city("Wondervale"),
            sla_hours: None,
        })
        .unwrap();
    assert_eq!(c.assigned_to.as_deref(), Some("cleaner-wv"));
}
