//! The lifecycle engine — intake, manual operations, and the escalation scan.
//!
//! RULES:
//!   - Every mutation of a stored complaint goes through the state machine
//!     and is persisted with a revision-keyed conditional update. Concurrent
//!     writers are linearized by the store; the loser sees a conflict.
//!   - Notification dispatch is fire-and-forget: a failed dispatch never
//!     fails a lifecycle operation that already committed.
//!   - The escalation scan isolates failures per complaint. One bad record
//!     or one store hiccup does not abort the rest of the batch; the next
//!     cycle naturally retries anything left un-escalated.

use crate::clock::Clock;
use crate::complaint::{
    AssignmentEntry, Complaint, ComplaintDraft, ComplaintStatus, Priority, StatusEntry,
};
use crate::config::EngineConfig;
use crate::error::{DeskError, DeskResult};
use crate::lifecycle::{self, TransitionOutcome};
use crate::matcher;
use crate::notify::{NotificationEvent, NotificationKind, Notifier};
use crate::sla;
use crate::store::{DeskStore, UpdateOutcome};
use crate::types::UserId;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Acting identity recorded when the matcher routes a new complaint.
pub const AUTO_ASSIGN_ACTOR: &str = "system-auto-assign";
/// Acting identity recorded when the escalation scan transitions a record.
pub const SLA_MONITOR_ACTOR: &str = "sla-monitor";
/// Acting identity on the initial OPEN entry written at intake.
pub const INTAKE_ACTOR: &str = "citizen-intake";

/// Outcome summary of one escalation scan.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CycleReport {
    pub scanned: usize,
    pub escalated: usize,
    pub warned: usize,
    pub failed: usize,
}

enum ScanOutcome {
    Escalated,
    Warned,
    Skipped,
}

pub struct LifecycleEngine {
    store: DeskStore,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl LifecycleEngine {
    pub fn new(
        store: DeskStore,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            config,
            clock,
            notifier,
        }
    }

    pub fn store(&self) -> &DeskStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Intake ─────────────────────────────────────────────────

    /// Create a complaint and attempt auto-assignment in one logical flow.
    ///
    /// The deadline is computed here, exactly once. When the matcher finds a
    /// qualified staff member the OPEN -> IN_PROGRESS transition and the
    /// assignment audit entry are persisted as a single conditional update.
    /// No qualified staff is a valid outcome: the complaint stays OPEN.
    pub fn create_and_maybe_assign(&self, draft: ComplaintDraft) -> DeskResult<Complaint> {
        validate_draft(&draft)?;

        let now = self.clock.now();
        let sla_hours = draft.sla_hours.unwrap_or(self.config.default_sla_hours);
        let due_at = sla::compute_due_at(now, sla_hours);

        let mut complaint = Complaint {
            complaint_id: Uuid::new_v4().to_string(),
            title: draft.title,
            description: draft.description,
            category: draft.category,
            priority: draft.priority.unwrap_or(Priority::Medium),
            status: ComplaintStatus::Open,
            reporter_id: draft.reporter_id,
            assigned_to: None,
            location: draft.location,
            created_at: now,
            sla_hours,
            due_at,
            resolved_at: None,
            escalation_level: 0,
            revision: 0,
        };

        self.store.insert_complaint(&complaint)?;
        self.store.append_status_entry(
            &complaint.complaint_id,
            &StatusEntry {
                status: ComplaintStatus::Open,
                actor: INTAKE_ACTOR.to_string(),
                notes: None,
                recorded_at: now,
            },
        )?;

        let directory = self.store.staff_by_city(&complaint.location.city)?;
        if let Some(staff) = matcher::select(&self.config, &complaint, &directory) {
            let staff_id = staff.staff_id.clone();
            let expected = complaint.revision;

            let outcome = lifecycle::apply(
                &mut complaint,
                ComplaintStatus::InProgress,
                AUTO_ASSIGN_ACTOR,
                Some(format!("auto-assigned to {staff_id}")),
                now,
            )?;
            complaint.assigned_to = Some(staff_id.clone());

            let status_entry = match &outcome {
                TransitionOutcome::Applied { entry } => Some(entry.clone()),
                TransitionOutcome::NoOp => None,
            };
            let assignment_entry = AssignmentEntry {
                assigned_to: staff_id.clone(),
                actor: AUTO_ASSIGN_ACTOR.to_string(),
                notes: Some("matched by city and profession".to_string()),
                recorded_at: now,
            };

            match self.store.apply_update(
                &complaint.complaint_id,
                expected,
                &complaint,
                status_entry.as_ref(),
                Some(&assignment_entry),
            )? {
                UpdateOutcome::Applied => {
                    complaint.revision = expected + 1;
                    self.dispatch(
                        &[staff_id],
                        &NotificationEvent {
                            kind: NotificationKind::Assigned,
                            complaint_id: complaint.complaint_id.clone(),
                            subject: format!("New Assignment: {}", complaint.title),
                            message: "A new complaint has been assigned to you.".to_string(),
                        },
                    );
                }
                UpdateOutcome::Conflict => {
                    return Err(DeskError::Conflict {
                        complaint_id: complaint.complaint_id,
                    })
                }
                UpdateOutcome::NotFound => {
                    return Err(DeskError::ComplaintNotFound {
                        complaint_id: complaint.complaint_id,
                    })
                }
            }
        } else {
            log::debug!(
                "no qualified staff in '{}' for '{}' — complaint {} stays OPEN",
                complaint.location.city,
                complaint.category,
                complaint.complaint_id
            );
        }

        Ok(complaint)
    }

    // ── Manual operations ──────────────────────────────────────

    /// Apply a status transition on behalf of `actor`.
    ///
    /// A request for the current status is a successful no-op. A concurrent
    /// modification surfaces as `Conflict`; the caller re-reads and retries.
    pub fn transition(
        &self,
        complaint_id: &str,
        target: ComplaintStatus,
        actor: &str,
        notes: Option<String>,
    ) -> DeskResult<Complaint> {
        let mut complaint = self.load(complaint_id)?;
        let now = self.clock.now();
        let expected = complaint.revision;

        let entry = match lifecycle::apply(&mut complaint, target, actor, notes, now)? {
            TransitionOutcome::NoOp => return Ok(complaint),
            TransitionOutcome::Applied { entry } => entry,
        };

        match self
            .store
            .apply_update(complaint_id, expected, &complaint, Some(&entry), None)?
        {
            UpdateOutcome::Applied => {
                complaint.revision = expected + 1;
                let recipients = recipients_of(&complaint);
                self.dispatch(
                    &recipients,
                    &NotificationEvent {
                        kind: NotificationKind::StatusChanged,
                        complaint_id: complaint.complaint_id.clone(),
                        subject: format!("Status Updated: {}", complaint.title),
                        message: format!("The complaint is now {}.", complaint.status),
                    },
                );
                Ok(complaint)
            }
            UpdateOutcome::Conflict => Err(DeskError::Conflict {
                complaint_id: complaint_id.to_string(),
            }),
            UpdateOutcome::NotFound => Err(DeskError::ComplaintNotFound {
                complaint_id: complaint_id.to_string(),
            }),
        }
    }

    /// Manually assign a staff member.
    ///
    /// Enforces the city invariant: the assignee must work in the complaint's
    /// city. An OPEN complaint also moves to IN_PROGRESS as part of the same
    /// update. Resolved complaints cannot be assigned.
    pub fn assign(
        &self,
        complaint_id: &str,
        staff_id: &str,
        actor: &str,
        notes: Option<String>,
    ) -> DeskResult<Complaint> {
        let mut complaint = self.load(complaint_id)?;
        let staff = self
            .store
            .get_staff(staff_id)?
            .ok_or_else(|| DeskError::StaffNotFound {
                staff_id: staff_id.to_string(),
            })?;

        if complaint.status == ComplaintStatus::Resolved {
            return Err(DeskError::Validation(
                "cannot assign a resolved complaint".to_string(),
            ));
        }
        if !matcher::same_city(&staff.city, &complaint.location.city) {
            return Err(DeskError::IneligibleStaff {
                staff_id: staff_id.to_string(),
                reason: format!(
                    "works in '{}' but the complaint is in '{}'",
                    staff.city, complaint.location.city
                ),
            });
        }

        let now = self.clock.now();
        let expected = complaint.revision;

        // OPEN moves to IN_PROGRESS; IN_PROGRESS/ESCALATED keep their status
        // (reassignment does not rewind the lifecycle).
        let status_entry = if complaint.status == ComplaintStatus::Open {
            match lifecycle::apply(
                &mut complaint,
                ComplaintStatus::InProgress,
                actor,
                None,
                now,
            )? {
                TransitionOutcome::Applied { entry } => Some(entry),
                TransitionOutcome::NoOp => None,
            }
        } else {
            None
        };
        complaint.assigned_to = Some(staff.staff_id.clone());

        let assignment_entry = AssignmentEntry {
            assigned_to: staff.staff_id.clone(),
            actor: actor.to_string(),
            notes,
            recorded_at: now,
        };

        match self.store.apply_update(
            complaint_id,
            expected,
            &complaint,
            status_entry.as_ref(),
            Some(&assignment_entry),
        )? {
            UpdateOutcome::Applied => {
                complaint.revision = expected + 1;
                self.dispatch(
                    &[staff.staff_id],
                    &NotificationEvent {
                        kind: NotificationKind::Assigned,
                        complaint_id: complaint.complaint_id.clone(),
                        subject: format!("New Assignment: {}", complaint.title),
                        message: "A complaint has been assigned to you.".to_string(),
                    },
                );
                Ok(complaint)
            }
            UpdateOutcome::Conflict => Err(DeskError::Conflict {
                complaint_id: complaint_id.to_string(),
            }),
            UpdateOutcome::NotFound => Err(DeskError::ComplaintNotFound {
                complaint_id: complaint_id.to_string(),
            }),
        }
    }

    // ── Escalation scan ────────────────────────────────────────

    /// One escalation cycle over all active complaints.
    ///
    /// Per-complaint failures are counted and logged without aborting the
    /// batch. Warnings are not deduplicated across cycles; escalation is
    /// applied at most once per complaint per deadline breach.
    pub fn run_escalation_cycle(&self) -> DeskResult<CycleReport> {
        let batch = self.store.active_complaints()?;
        let mut report = CycleReport {
            scanned: batch.len(),
            ..CycleReport::default()
        };

        for complaint in batch {
            let complaint_id = complaint.complaint_id.clone();
            match self.scan_one(complaint) {
                Ok(ScanOutcome::Escalated) => report.escalated += 1,
                Ok(ScanOutcome::Warned) => report.warned += 1,
                Ok(ScanOutcome::Skipped) => {}
                Err(e) => {
                    report.failed += 1;
                    log::warn!("escalation scan failed for complaint {complaint_id}: {e}");
                }
            }
        }

        log::info!(
            "escalation cycle: scanned={} escalated={} warned={} failed={}",
            report.scanned,
            report.escalated,
            report.warned,
            report.failed
        );
        Ok(report)
    }

    fn scan_one(&self, complaint: Complaint) -> DeskResult<ScanOutcome> {
        let now = self.clock.now();
        let ratio = sla::elapsed_ratio(complaint.created_at, complaint.due_at, now);

        // An already-ESCALATED record never gets a second level bump; it
        // falls through to the warning branch instead, so its assignee keeps
        // being nudged every cycle until it resolves.
        if ratio >= self.config.escalation_ratio
            && complaint.status != ComplaintStatus::Escalated
        {
            return self.escalate(complaint, true);
        }

        if ratio >= self.config.warning_ratio {
            if let Some(assignee) = complaint.assigned_to.clone() {
                self.notifier.notify(
                    &[assignee],
                    &NotificationEvent {
                        kind: NotificationKind::SlaWarning,
                        complaint_id: complaint.complaint_id.clone(),
                        subject: format!("SLA Warning: {}", complaint.title),
                        message: "The complaint is nearing its SLA deadline. Please address \
                                  promptly."
                            .to_string(),
                    },
                )?;
                return Ok(ScanOutcome::Warned);
            }
            return Ok(ScanOutcome::Skipped);
        }

        Ok(ScanOutcome::Skipped)
    }

    fn escalate(&self, mut complaint: Complaint, retry_on_conflict: bool) -> DeskResult<ScanOutcome> {
        let now = self.clock.now();
        let expected = complaint.revision;

        let entry = match lifecycle::apply(
            &mut complaint,
            ComplaintStatus::Escalated,
            SLA_MONITOR_ACTOR,
            Some("SLA deadline exceeded".to_string()),
            now,
        )? {
            TransitionOutcome::Applied { entry } => entry,
            TransitionOutcome::NoOp => return Ok(ScanOutcome::Skipped),
        };
        complaint.escalation_level += 1;

        match self.store.apply_update(
            &complaint.complaint_id,
            expected,
            &complaint,
            Some(&entry),
            None,
        )? {
            UpdateOutcome::Applied => {
                let recipients = recipients_of(&complaint);
                self.dispatch(
                    &recipients,
                    &NotificationEvent {
                        kind: NotificationKind::SlaEscalation,
                        complaint_id: complaint.complaint_id.clone(),
                        subject: format!("Complaint Escalated: {}", complaint.title),
                        message: "The issue has exceeded the SLA and has been escalated."
                            .to_string(),
                    },
                );
                Ok(ScanOutcome::Escalated)
            }
            UpdateOutcome::Conflict if retry_on_conflict => {
                // Someone else wrote first. Re-read and re-evaluate once; a
                // record resolved or escalated in the meantime is skipped.
                match self.store.get_complaint(&complaint.complaint_id)? {
                    Some(fresh)
                        if fresh.status != ComplaintStatus::Resolved
                            && fresh.status != ComplaintStatus::Escalated =>
                    {
                        self.escalate(fresh, false)
                    }
                    _ => Ok(ScanOutcome::Skipped),
                }
            }
            UpdateOutcome::Conflict => Err(DeskError::Conflict {
                complaint_id: complaint.complaint_id,
            }),
            UpdateOutcome::NotFound => Err(DeskError::ComplaintNotFound {
                complaint_id: complaint.complaint_id,
            }),
        }
    }

    // ── Helpers ────────────────────────────────────────────────

    fn load(&self, complaint_id: &str) -> DeskResult<Complaint> {
        self.store
            .get_complaint(complaint_id)?
            .ok_or_else(|| DeskError::ComplaintNotFound {
                complaint_id: complaint_id.to_string(),
            })
    }

    fn dispatch(&self, recipients: &[UserId], event: &NotificationEvent) {
        if recipients.is_empty() {
            return;
        }
        if let Err(e) = self.notifier.notify(recipients, event) {
            log::warn!(
                "notification dispatch failed for complaint {}: {e}",
                event.complaint_id
            );
        }
    }

    /// Current wall-clock as seen by the engine. Exposed for the runner.
    pub fn now(&self) -> chrono::DateTime<Utc> {
        self.clock.now()
    }
}

fn recipients_of(complaint: &Complaint) -> Vec<UserId> {
    complaint
        .reporter_id
        .iter()
        .chain(complaint.assigned_to.iter())
        .cloned()
        .collect()
}

fn validate_draft(draft: &ComplaintDraft) -> DeskResult<()> {
    if draft.title.trim().is_empty() {
        return Err(DeskError::Validation("title must not be empty".to_string()));
    }
    if draft.description.trim().is_empty() {
        return Err(DeskError::Validation(
            "description must not be empty".to_string(),
        ));
    }
    if draft.location.city.trim().is_empty() {
        return Err(DeskError::Validation(
            "location.city is required for assignment".to_string(),
        ));
    }
    if let Some(hours) = draft.sla_hours {
        if hours <= 0.0 || hours > sla::MAX_SLA_HOURS {
            return Err(DeskError::Validation(format!(
                "sla_hours override must be in (0, {}]",
                sla::MAX_SLA_HOURS
            )));
        }
    }
    Ok(())
}
