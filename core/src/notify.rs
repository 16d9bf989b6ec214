//! Notification dispatch seam.
//!
//! The engine builds events and hands them to a `Notifier`; delivery
//! (email, socket, push) is the dispatcher's concern, not this core's.
//! Dispatch is fire-and-forget from the engine's perspective — a failed
//! dispatch is logged, never propagated into a lifecycle operation.

use crate::types::{ComplaintId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Assigned,
    StatusChanged,
    SlaWarning,
    SlaEscalation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub complaint_id: ComplaintId,
    pub subject: String,
    pub message: String,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, recipients: &[UserId], event: &NotificationEvent) -> anyhow::Result<()>;
}

/// In-memory dispatcher that records every payload. Used by tests and by
/// embedders that batch outbound messages themselves.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: std::sync::Mutex<Vec<(Vec<UserId>, NotificationEvent)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(Vec<UserId>, NotificationEvent)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_of_kind(&self, kind: NotificationKind) -> Vec<(Vec<UserId>, NotificationEvent)> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, event)| event.kind == kind)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, recipients: &[UserId], event: &NotificationEvent) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((recipients.to_vec(), event.clone()));
        Ok(())
    }
}

/// Production dispatcher stand-in: logs the full payload as JSON.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, recipients: &[UserId], event: &NotificationEvent) -> anyhow::Result<()> {
        let payload = serde_json::json!({
            "recipients": recipients,
            "kind": event.kind,
            "complaint_id": event.complaint_id,
            "subject": event.subject,
            "message": event.message,
        });
        log::info!("notification: {payload}");
        Ok(())
    }
}
