//! Audit trail of authentication and authorization state changes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use qaflow_core::{ProjectId, UserId};

use crate::{Permission, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Login,
    LoginFailed,
    Logout,
    IdleTimeout,
    SessionRevoked,
    AccountDeactivated,
    ForceLogout,
    SessionSuperseded,
    PrincipalUpdated,
    PermissionGranted,
    PermissionRevoked,
    GrantsSwept,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "login",
            AuditAction::LoginFailed => "login_failed",
            AuditAction::Logout => "logout",
            AuditAction::IdleTimeout => "idle_timeout",
            AuditAction::SessionRevoked => "session_revoked",
            AuditAction::AccountDeactivated => "account_deactivated",
            AuditAction::ForceLogout => "force_logout",
            AuditAction::SessionSuperseded => "session_superseded",
            AuditAction::PrincipalUpdated => "principal_updated",
            AuditAction::PermissionGranted => "permission_granted",
            AuditAction::PermissionRevoked => "permission_revoked",
            AuditAction::GrantsSwept => "grants_swept",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub action: AuditAction,
    /// Subject of the entry (the user whose session/permissions changed).
    pub user_id: Option<UserId>,
    /// Who performed the change, when different from the subject.
    pub actor_id: Option<UserId>,
    pub project_id: Option<ProjectId>,
    pub permission: Option<Permission>,
    pub detail: String,
}

impl AuditEntry {
    pub fn new(at: DateTime<Utc>, action: AuditAction, user_id: Option<UserId>, detail: impl Into<String>) -> Self {
        Self {
            at,
            action,
            user_id,
            actor_id: None,
            project_id: None,
            permission: None,
            detail: detail.into(),
        }
    }

    pub fn with_actor(mut self, actor_id: UserId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with_project(mut self, project_id: ProjectId, permission: Permission) -> Self {
        self.project_id = Some(project_id);
        self.permission = Some(permission);
        self
    }
}

/// Destination for audit entries.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry) -> Result<(), StoreError>;
}

/// Writes audit entries as structured `tracing` events (target `qaflow::audit`).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: AuditEntry) -> Result<(), StoreError> {
        tracing::info!(
            target: "qaflow::audit",
            action = entry.action.as_str(),
            user_id = ?entry.user_id,
            actor_id = ?entry.actor_id,
            project_id = ?entry.project_id,
            permission = ?entry.permission,
            detail = %entry.detail,
            "audit"
        );
        Ok(())
    }
}

/// Record an entry; sink failures are logged and swallowed.
pub(crate) fn record_best_effort(sink: &dyn AuditSink, entry: AuditEntry) {
    let action = entry.action;
    if let Err(e) = sink.record(entry) {
        tracing::warn!(action = action.as_str(), error = %e, "audit write failed");
    }
}
