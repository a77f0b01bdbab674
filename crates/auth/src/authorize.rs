//! Authorization decision values and explanations.
//!
//! Decisions are plain data: the engine never performs redirects or writes
//! HTTP responses itself. Consumers map a [`Denial`] onto their transport.

use serde::Serialize;

use qaflow_core::{ProjectId, UserId};

use crate::{Permission, Role, SessionError, TeamRole};

/// Outcome of a `require_*` check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), Denial> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(denial) => Err(denial),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// No acceptable session; consumers redirect to the login page.
    Session,
    /// Role requirement not met.
    InsufficientRole,
    /// No precedence layer granted the project permission.
    MissingPermission,
}

/// Structured deny result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Denial {
    pub kind: DenialKind,
    pub http_status: u16,
    pub redirect_target: Option<String>,
    /// Reason code for session denials (`idle_timeout`, `revoked`, ...).
    pub reason: Option<&'static str>,
    pub message: String,
}

impl Denial {
    pub fn session(error: &SessionError, login_path: &str) -> Self {
        Self {
            kind: DenialKind::Session,
            http_status: 303,
            redirect_target: Some(format!("{login_path}?reason={}", error.reason())),
            reason: Some(error.reason()),
            message: match error {
                SessionError::Anonymous => "Please log in to continue.".to_string(),
                SessionError::IdleTimeout => "Your session expired due to inactivity. Please log in again.".to_string(),
                SessionError::Revoked => "Your session was ended. Please log in again.".to_string(),
                SessionError::Deactivated => "Your account has been deactivated.".to_string(),
                SessionError::Unavailable(_) => "Sign-in is temporarily unavailable. Please try again.".to_string(),
            },
        }
    }

    pub fn insufficient_role(required: &str, redirect_target: &str) -> Self {
        Self {
            kind: DenialKind::InsufficientRole,
            http_status: 403,
            redirect_target: Some(redirect_target.to_string()),
            reason: None,
            message: format!("Access denied: requires {required}."),
        }
    }

    pub fn missing_permission(permission: Permission) -> Self {
        Self {
            kind: DenialKind::MissingPermission,
            http_status: 403,
            redirect_target: None,
            reason: None,
            message: format!("Access denied: missing permission '{permission}' on this project."),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Project permission explanation (audit trail)
// ─────────────────────────────────────────────────────────────────────────────

/// The precedence layer that granted a project permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "layer", content = "team_role", rename_all = "snake_case")]
pub enum PrecedenceLayer {
    Global,
    ProjectLead,
    TeamRole(TeamRole),
    ExplicitGrant,
}

impl PrecedenceLayer {
    pub fn describe(&self) -> String {
        match self {
            PrecedenceLayer::Global => "global role override (admin/super_admin)".to_string(),
            PrecedenceLayer::ProjectLead => "project lead designation".to_string(),
            PrecedenceLayer::TeamRole(role) => format!("team role '{role}' basic permissions"),
            PrecedenceLayer::ExplicitGrant => "explicit permission grant".to_string(),
        }
    }
}

/// Detailed explanation of a project permission decision.
///
/// Answers "why was this allowed/denied?" for admin tooling.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionExplanation {
    pub user_id: UserId,
    pub role: Role,
    pub project_id: ProjectId,
    pub required_permission: Permission,
    pub granted: bool,
    pub layer: Option<PrecedenceLayer>,
    pub reason: String,
    /// Everything the user holds on the project (sorted).
    pub effective_permissions: Vec<Permission>,
    /// Hints for resolving a denial; empty when granted.
    pub suggestions: Vec<String>,
}

impl PermissionExplanation {
    pub(crate) fn build(
        user_id: UserId,
        role: Role,
        project_id: ProjectId,
        required: Permission,
        layer: Option<PrecedenceLayer>,
        effective_permissions: Vec<Permission>,
    ) -> Self {
        match layer {
            Some(layer) => Self {
                user_id,
                role,
                project_id,
                required_permission: required,
                granted: true,
                layer: Some(layer),
                reason: format!("'{required}' granted by {}", layer.describe()),
                effective_permissions,
                suggestions: Vec::new(),
            },
            None => {
                let mut suggestions = vec![
                    format!("Grant '{required}' explicitly on project {project_id}"),
                    format!("Assign a team role on project {project_id} whose basic permissions include '{required}'"),
                ];
                let granting_roles: Vec<&str> = TeamRole::ALL
                    .iter()
                    .filter(|r| r.grants(required))
                    .map(|r| r.as_str())
                    .collect();
                if !granting_roles.is_empty() {
                    suggestions.push(format!("Team roles that include it: {}", granting_roles.join(", ")));
                }
                Self {
                    user_id,
                    role,
                    project_id,
                    required_permission: required,
                    granted: false,
                    layer: None,
                    reason: format!(
                        "no precedence layer grants '{required}'; current permissions: {}",
                        effective_permissions
                            .iter()
                            .map(Permission::as_str)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                    effective_permissions,
                    suggestions,
                }
            }
        }
    }
}
