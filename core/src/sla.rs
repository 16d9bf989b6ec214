//! SLA deadline arithmetic.
//!
//! POLICY: `due_at` is derived exactly once, at complaint creation. Changing
//! the SLA duration later has no retroactive effect on existing complaints.

use chrono::{DateTime, Duration, Utc};

/// Largest SLA window accepted anywhere, in hours (one year). Keeps the
/// millisecond conversion well inside `i64` and chrono's datetime range.
pub const MAX_SLA_HOURS: f64 = 8_760.0;

/// Compute the fixed deadline for a complaint.
///
/// Pure and total. `sla_hours` must be positive and at most
/// [`MAX_SLA_HOURS`] (the engine and config validate before calling);
/// fractional hours are honoured to the millisecond.
pub fn compute_due_at(created_at: DateTime<Utc>, sla_hours: f64) -> DateTime<Utc> {
    let millis = (sla_hours * 3_600_000.0).round() as i64;
    created_at + Duration::milliseconds(millis)
}

/// Fraction of the SLA window consumed at `now`.
///
/// 0.0 at creation, 1.0 exactly at the deadline, above 1.0 once overdue.
/// A degenerate zero-length window (due_at == created_at) reads as fully
/// consumed rather than dividing by zero.
pub fn elapsed_ratio(
    created_at: DateTime<Utc>,
    due_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    let total = (due_at - created_at).num_milliseconds();
    if total <= 0 {
        return f64::INFINITY;
    }
    let elapsed = (now - created_at).num_milliseconds();
    elapsed as f64 / total as f64
}
