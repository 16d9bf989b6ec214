//! Lifecycle state machine.
//!
//! RULES:
//!   - The state machine is the sole mutator of `status`, `resolved_at`,
//!     and the status audit trail.
//!   - It performs no I/O. Callers persist the mutated record plus the
//!     returned history entry in one conditional store update, and forward
//!     any notification themselves.
//!
//! Transition table:
//!   OPEN        -> IN_PROGRESS | ESCALATED
//!   IN_PROGRESS -> ESCALATED   | RESOLVED
//!   ESCALATED   -> RESOLVED
//!   RESOLVED    -> (terminal)
//!
//! Requesting the current status again is a successful no-op: the record is
//! returned unchanged and no duplicate history entry is produced.

use crate::complaint::{Complaint, ComplaintStatus, StatusEntry};
use crate::error::{DeskError, DeskResult};
use chrono::{DateTime, Utc};

pub fn can_transition(from: ComplaintStatus, to: ComplaintStatus) -> bool {
    use ComplaintStatus::*;
    matches!(
        (from, to),
        (Open, InProgress)
            | (Open, Escalated)
            | (InProgress, Escalated)
            | (InProgress, Resolved)
            | (Escalated, Resolved)
    )
}

#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    /// The record mutated; persist it together with this history entry.
    Applied { entry: StatusEntry },
    /// Target equalled the current status. Nothing changed, nothing to append.
    NoOp,
}

/// Apply a status transition in place.
///
/// On an edge outside the table this returns `InvalidTransition` and the
/// record is left untouched. Entering RESOLVED stamps `resolved_at` with the
/// transition timestamp, only if it was never set before.
pub fn apply(
    complaint: &mut Complaint,
    target: ComplaintStatus,
    actor: &str,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> DeskResult<TransitionOutcome> {
    if complaint.status == target {
        return Ok(TransitionOutcome::NoOp);
    }
    if !can_transition(complaint.status, target) {
        return Err(DeskError::InvalidTransition {
            from: complaint.status,
            to: target,
        });
    }

    complaint.status = target;
    if target == ComplaintStatus::Resolved && complaint.resolved_at.is_none() {
        complaint.resolved_at = Some(now);
    }

    Ok(TransitionOutcome::Applied {
        entry: StatusEntry {
            status: target,
            actor: actor.to_string(),
            notes,
            recorded_at: now,
        },
    })
}
