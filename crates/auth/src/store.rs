//! Storage boundaries of the engine.
//!
//! The engine only talks to these traits; implementations live in the infra
//! layer. Every mutation is a single atomic statement against one logical
//! record; no method requires a cross-record transaction.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use qaflow_core::{ProjectId, SessionId, UserId};

use crate::{
    EndReason, GrantRequest, Permission, PermissionGrant, PrincipalRecord, ProjectRecord, Role,
    Session, SessionState, SessionToken, TeamAssignment,
};

/// Storage operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or failed mid-operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The write conflicts with a uniqueness constraint.
    #[error("store conflict: {0}")]
    Conflict(String),
}

/// Durable session rows.
pub trait SessionStore: Send + Sync {
    /// Insert a row, replacing an existing row with the same token.
    fn insert(&self, session: Session) -> Result<(), StoreError>;

    /// Row for `(token, user_id)`, active or not.
    fn find(&self, token: &SessionToken, user_id: UserId) -> Result<Option<Session>, StoreError>;

    /// Row carrying `session_id` for this user under any token, active or not.
    fn find_by_id(&self, session_id: SessionId, user_id: UserId) -> Result<Option<Session>, StoreError>;

    /// Advance `last_activity_at` of an active row (never moves it backwards).
    fn touch(&self, token: &SessionToken, user_id: UserId, at: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Deactivate one active row. Returns `false` if there was no active row.
    fn end(
        &self,
        token: &SessionToken,
        user_id: UserId,
        reason: EndReason,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Deactivate every active row of a user; returns how many were ended.
    fn end_all_for_user(&self, user_id: UserId, reason: EndReason, at: DateTime<Utc>) -> Result<usize, StoreError>;

    /// Re-key an active row to a new token.
    fn rotate_token(&self, old: &SessionToken, new: &SessionToken, user_id: UserId) -> Result<bool, StoreError>;

    /// Attach best-effort geolocation to a row.
    fn record_geo(&self, token: &SessionToken, user_id: UserId, geo_location: &str) -> Result<bool, StoreError>;

    /// All rows of a user, newest first.
    fn list_for_user(&self, user_id: UserId) -> Result<Vec<Session>, StoreError>;
}

/// Ephemeral per-token session state (server-side, process-local).
///
/// A token with no entry here is anonymous.
pub trait SessionCache: Send + Sync {
    fn get(&self, token: &SessionToken) -> Option<SessionState>;
    fn put(&self, state: SessionState);
    fn remove(&self, token: &SessionToken) -> Option<SessionState>;

    /// Drop every entry whose last activity is before `cutoff`; returns them.
    fn evict_idle(&self, cutoff: DateTime<Utc>) -> Vec<SessionState>;
}

/// Durable user records.
pub trait PrincipalDirectory: Send + Sync {
    /// Look up by username or email, regardless of the active flag.
    fn find_by_login(&self, identifier: &str) -> Result<Option<PrincipalRecord>, StoreError>;
    fn get(&self, id: UserId) -> Result<Option<PrincipalRecord>, StoreError>;
    fn set_active(&self, id: UserId, active: bool) -> Result<bool, StoreError>;
    fn set_role(&self, id: UserId, role: Role) -> Result<bool, StoreError>;
}

/// Project designations and team assignments.
pub trait ProjectDirectory: Send + Sync {
    fn project(&self, id: ProjectId) -> Result<Option<ProjectRecord>, StoreError>;
    fn all_projects(&self) -> Result<Vec<ProjectId>, StoreError>;
    /// Projects where the user is lead or creator.
    fn projects_led_or_created_by(&self, user_id: UserId) -> Result<Vec<ProjectId>, StoreError>;
    /// Assignments of a user on one project, including removed ones.
    fn team_assignments(&self, project_id: ProjectId, user_id: UserId) -> Result<Vec<TeamAssignment>, StoreError>;
    /// All assignments of a user, including removed ones.
    fn assignments_for_user(&self, user_id: UserId) -> Result<Vec<TeamAssignment>, StoreError>;
}

/// Explicit permission grants, unique on `(project, user, permission)`.
pub trait GrantStore: Send + Sync {
    /// Insert, or reactivate and overwrite the metadata of the existing row.
    fn upsert(&self, request: GrantRequest, at: DateTime<Utc>) -> Result<PermissionGrant, StoreError>;

    /// Soft-revoke (`is_active = false`). Returns `false` if no active row matched.
    fn revoke(&self, project_id: ProjectId, user_id: UserId, permission: Permission) -> Result<bool, StoreError>;

    fn find(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        permission: Permission,
    ) -> Result<Option<PermissionGrant>, StoreError>;

    fn list_for(&self, project_id: ProjectId, user_id: UserId) -> Result<Vec<PermissionGrant>, StoreError>;
    fn list_for_user(&self, user_id: UserId) -> Result<Vec<PermissionGrant>, StoreError>;
    fn list_for_project(&self, project_id: ProjectId) -> Result<Vec<PermissionGrant>, StoreError>;

    /// Flip `is_active = false` on active rows whose expiry has passed.
    fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;

    /// Active rows expiring in `(now, now + window]`, soonest first.
    fn expiring_within(&self, now: DateTime<Utc>, window: Duration) -> Result<Vec<PermissionGrant>, StoreError>;
}
