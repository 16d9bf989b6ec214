//! Escalation scan tests: the 0.75 warning band, the 1.0 escalation
//! boundary, idempotent re-scans, and per-item failure isolation.

use chrono::{DateTime, Duration, TimeZone, Utc};
use civicdesk_core::{
    clock::ManualClock,
    complaint::{Complaint, ComplaintCategory, ComplaintDraft, ComplaintStatus, Location},
    config::EngineConfig,
    engine::{LifecycleEngine, SLA_MONITOR_ACTOR},
    notify::{NotificationEvent, NotificationKind, Notifier, RecordingNotifier},
    staff::{Profession, StaffProfile},
    store::DeskStore,
};
use std::sync::Arc;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
}

fn build_engine() -> (LifecycleEngine, Arc<ManualClock>, Arc<RecordingNotifier>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = DeskStore::in_memory().unwrap();
    store.migrate().unwrap();
    let clock = Arc::new(ManualClock::new(start()));
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = LifecycleEngine::new(
        store,
        EngineConfig::default(),
        clock.clone(),
        notifier.clone(),
    );
    (engine, clock, notifier)
}

/// Files a Water Leakage complaint with a 10h SLA; with a plumber present it
/// comes back assigned and IN_PROGRESS.
fn file_with_plumber(engine: &LifecycleEngine) -> Complaint {
    engine
        .store()
        .insert_staff(&StaffProfile {
            staff_id: "plumber-wv".to_string(),
            full_name: "Mara Voss".to_string(),
            profession: Profession::Plumber,
            city: "Wondervale".to_string(),
        })
        .unwrap();
    engine
        .create_and_maybe_assign(ComplaintDraft {
            title: "Main line leak".to_string(),
            description: "Water main leaking near the depot".to_string(),
            category: ComplaintCategory::WaterLeakage,
            priority: None,
            reporter_id: Some("reporter-1".to_string()),
            location: Location::city("Wondervale"),
            sla_hours: Some(10.0),
        })
        .unwrap()
}

/// At ratio 0.75 the assignee gets a warning and nothing else changes.
#[test]
fn warning_band_notifies_assignee_without_status_change() {
    let (engine, clock, notifier) = build_engine();
    let c = file_with_plumber(&engine);
    notifier.clear();

    clock.advance(Duration::minutes(7 * 60 + 30)); // 7.5h of a 10h SLA
    let report = engine.run_escalation_cycle().unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.warned, 1);
    assert_eq!(report.escalated, 0);
    assert_eq!(report.failed, 0);

    let stored = engine
        .store()
        .get_complaint(&c.complaint_id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ComplaintStatus::InProgress);
    assert_eq!(stored.escalation_level, 0);

    let warnings = notifier.sent_of_kind(NotificationKind::SlaWarning);
    assert_eq!(warnings.len(), 1);
    // Warning goes to the assignee only, never the reporter.
    assert_eq!(warnings[0].0, vec!["plumber-wv".to_string()]);
}

/// Warnings are not deduplicated: each cycle in the warning band sends one.
#[test]
fn warning_repeats_every_cycle() {
    let (engine, clock, notifier) = build_engine();
    file_with_plumber(&engine);
    notifier.clear();

    clock.advance(Duration::minutes(8 * 60));
    engine.run_escalation_cycle().unwrap();
    engine.run_escalation_cycle().unwrap();
    assert_eq!(notifier.sent_of_kind(NotificationKind::SlaWarning).len(), 2);
}

/// Past the deadline the complaint escalates: status ESCALATED, level bumped
/// from 0 to 1, one escalation notification to reporter and assignee, one
/// audit entry by the monitor identity.
#[test]
fn overdue_complaint_escalates_once() {
    let (engine, clock, notifier) = build_engine();
    let c = file_with_plumber(&engine);
    notifier.clear();

    clock.advance(Duration::minutes(10 * 60 + 30)); // ratio 1.05
    let report = engine.run_escalation_cycle().unwrap();
    assert_eq!(report.escalated, 1);
    assert_eq!(report.warned, 0);

    let stored = engine
        .store()
        .get_complaint(&c.complaint_id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ComplaintStatus::Escalated);
    assert_eq!(stored.escalation_level, 1);

    let escalations = notifier.sent_of_kind(NotificationKind::SlaEscalation);
    assert_eq!(escalations.len(), 1);
    assert_eq!(
        escalations[0].0,
        vec!["reporter-1".to_string(), "plumber-wv".to_string()]
    );

    let history = engine.store().status_history(&c.complaint_id).unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.status, ComplaintStatus::Escalated);
    assert_eq!(last.actor, SLA_MONITOR_ACTOR);
}

/// Re-scanning an already-ESCALATED complaint never bumps the level or sends
/// a second escalation notification, but its assignee still gets a warning
/// every cycle until the complaint resolves.
#[test]
fn escalated_rescan_keeps_warning_without_second_bump() {
    let (engine, clock, notifier) = build_engine();
    let c = file_with_plumber(&engine);

    clock.advance(Duration::minutes(10 * 60 + 30));
    engine.run_escalation_cycle().unwrap();
    notifier.clear();

    clock.advance(Duration::hours(2));
    let report = engine.run_escalation_cycle().unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.escalated, 0);
    assert_eq!(report.warned, 1);

    let stored = engine
        .store()
        .get_complaint(&c.complaint_id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.escalation_level, 1);
    assert!(notifier.sent_of_kind(NotificationKind::SlaEscalation).is_empty());

    let warnings = notifier.sent_of_kind(NotificationKind::SlaWarning);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].0, vec!["plumber-wv".to_string()]);

    // Each further cycle nudges again.
    engine.run_escalation_cycle().unwrap();
    assert_eq!(notifier.sent_of_kind(NotificationKind::SlaWarning).len(), 2);
}

/// An unassigned OPEN complaint can still escalate (OPEN -> ESCALATED); the
/// notification then goes to the reporter alone.
#[test]
fn open_unassigned_complaint_escalates() {
    let (engine, clock, notifier) = build_engine();
    // No staff seeded: the complaint stays OPEN and unassigned.
    let c = engine
        .create_and_maybe_assign(ComplaintDraft {
            title: "Collapsed drain cover".to_string(),
            description: "Open drain on the cycle path".to_string(),
            category: ComplaintCategory::CloggedDrain,
            priority: None,
            reporter_id: Some("reporter-2".to_string()),
            location: Location::city("Wondervale"),
            sla_hours: Some(4.0),
        })
        .unwrap();
    assert_eq!(c.status, ComplaintStatus::Open);

    clock.advance(Duration::hours(5));
    let report = engine.run_escalation_cycle().unwrap();
    assert_eq!(report.escalated, 1);

    let escalations = notifier.sent_of_kind(NotificationKind::SlaEscalation);
    assert_eq!(escalations[0].0, vec!["reporter-2".to_string()]);
}

/// In the warning band with no assignee there is nobody to warn: the record
/// is skipped, not failed.
#[test]
fn warning_band_without_assignee_is_skipped() {
    let (engine, clock, notifier) = build_engine();
    engine
        .create_and_maybe_assign(ComplaintDraft {
            title: "Flickering park lights".to_string(),
            description: "Lights flicker after dusk".to_string(),
            category: ComplaintCategory::Lighting,
            priority: None,
            reporter_id: Some("reporter-3".to_string()),
            location: Location::city("Wondervale"),
            sla_hours: Some(10.0),
        })
        .unwrap();

    clock.advance(Duration::hours(8));
    let report = engine.run_escalation_cycle().unwrap();
    assert_eq!(report.warned, 0);
    assert_eq!(report.failed, 0);
    assert!(notifier.sent().is_empty());
}

/// RESOLVED complaints never enter the scan.
#[test]
fn resolved_complaints_are_excluded_from_the_scan() {
    let (engine, clock, _notifier) = build_engine();
    let c = file_with_plumber(&engine);
    engine
        .transition(&c.complaint_id, ComplaintStatus::Resolved, "plumber-wv", None)
        .unwrap();

    clock.advance(Duration::hours(48));
    let report = engine.run_escalation_cycle().unwrap();
    assert_eq!(report.scanned, 0);
}

/// A notifier that always fails; used to prove per-item isolation.
#[derive(Debug, Default)]
struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _recipients: &[String], _event: &NotificationEvent) -> anyhow::Result<()> {
        anyhow::bail!("dispatcher unreachable")
    }
}

/// One complaint's dispatch failure is counted and logged; the rest of the
/// batch still gets processed, and committed state changes stand.
#[test]
fn cycle_isolates_per_item_failures() {
    let store = DeskStore::in_memory().unwrap();
    store.migrate().unwrap();
    let clock = Arc::new(ManualClock::new(start()));
    let engine = LifecycleEngine::new(
        store,
        EngineConfig::default(),
        clock.clone(),
        Arc::new(FailingNotifier),
    );

    engine
        .store()
        .insert_staff(&StaffProfile {
            staff_id: "plumber-wv".to_string(),
            full_name: "Mara Voss".to_string(),
            profession: Profession::Plumber,
            city: "Wondervale".to_string(),
        })
        .unwrap();

    // One complaint in the warning band (its warning dispatch will fail) and
    // one overdue (its escalation commits regardless of dispatch).
    let warned = engine
        .create_and_maybe_assign(ComplaintDraft {
            title: "Dripping valve".to_string(),
            description: "Slow leak at the pump house".to_string(),
            category: ComplaintCategory::WaterLeakage,
            priority: None,
            reporter_id: None,
            location: Location::city("Wondervale"),
            sla_hours: Some(10.0),
        })
        .unwrap();
    let overdue = engine
        .create_and_maybe_assign(ComplaintDraft {
            title: "Burst pipe".to_string(),
            description: "Major burst under Main Street".to_string(),
            category: ComplaintCategory::BrokenPipe,
            priority: None,
            reporter_id: None,
            location: Location::city("Wondervale"),
            sla_hours: Some(4.0),
        })
        .unwrap();

    clock.advance(Duration::hours(8)); // warned: ratio 0.8; overdue: ratio 2.0
    let report = engine.run_escalation_cycle().unwrap();
    assert_eq!(report.scanned, 2);
    assert_eq!(report.failed, 1, "the failed warning dispatch");
    assert_eq!(report.escalated, 1, "escalation committed before dispatch");

    let stored = engine
        .store()
        .get_complaint(&overdue.complaint_id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ComplaintStatus::Escalated);
    let stored_warned = engine
        .store()
        .get_complaint(&warned.complaint_id)
        .unwrap()
        .unwrap();
    assert_eq!(stored_warned.status, ComplaintStatus::InProgress);
}
