use std::sync::Mutex;

use qaflow_auth::{AuditAction, AuditEntry, AuditSink, StoreError};

use super::poisoned;

/// Keeps audit entries in memory, and mirrors them to `tracing`.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn actions(&self) -> Vec<AuditAction> {
        self.entries().into_iter().map(|e| e.action).collect()
    }

    pub fn count(&self, action: AuditAction) -> usize {
        self.entries().iter().filter(|e| e.action == action).count()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, entry: AuditEntry) -> Result<(), StoreError> {
        tracing::debug!(
            target: "qaflow::audit",
            action = entry.action.as_str(),
            user_id = ?entry.user_id,
            detail = %entry.detail,
            "audit"
        );
        self.entries.lock().map_err(poisoned)?.push(entry);
        Ok(())
    }
}
