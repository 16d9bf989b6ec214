use crate::complaint::ComplaintStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: ComplaintStatus,
        to: ComplaintStatus,
    },

    #[error("Staff '{staff_id}' is not eligible: {reason}")]
    IneligibleStaff { staff_id: String, reason: String },

    #[error("Complaint '{complaint_id}' was modified concurrently; re-read and retry")]
    Conflict { complaint_id: String },

    #[error("Complaint '{complaint_id}' not found")]
    ComplaintNotFound { complaint_id: String },

    #[error("Staff '{staff_id}' not found")]
    StaffNotFound { staff_id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DeskResult<T> = Result<T, DeskError>;
