//! Shared primitive types used across the engine.

/// A stable, unique identifier for a complaint.
pub type ComplaintId = String;

/// A stable, unique identifier for a staff member or reporter.
pub type UserId = String;
