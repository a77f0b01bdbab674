//! Project-scoped authorization records: explicit permission grants, team
//! assignments and project lead/creator designations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use qaflow_core::{GrantId, ProjectId, UserId};

use crate::{Permission, TeamRole};

/// Explicit, time-bounded permission grant.
///
/// Natural key: `(project_id, user_id, permission)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub id: GrantId,
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub permission: Permission,
    pub granted_by: UserId,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub notes: Option<String>,
}

impl PermissionGrant {
    /// A grant is in force iff it is active and not past its expiry.
    ///
    /// The time bound is checked here regardless of whether the expiry sweep
    /// has already flipped `is_active`.
    pub fn is_in_force(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|exp| exp > now)
    }
}

/// Input for granting (or re-granting) a permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRequest {
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub permission: Permission,
    pub granted_by: UserId,
    pub expires_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Project-scoped team role assignment (soft-deletable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamAssignment {
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub role: TeamRole,
    pub is_removed: bool,
}

/// The slice of a project record authorization needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub project_lead_id: Option<UserId>,
    pub created_by: UserId,
}
