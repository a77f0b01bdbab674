use std::str::FromStr;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use qaflow_auth::{Permission, PermissionGrant, Principal, Role, Session};
use qaflow_core::{ProjectId, UserId};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    pub identifier: String,
    pub password: String,
}

impl core::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
pub struct GrantPermissionRequest {
    pub user_id: i64,
    pub permission: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    pub days: Option<i64>,
}

// -------------------------
// Path parsing
// -------------------------

pub fn parse_project_id(raw: &str) -> Result<ProjectId, axum::response::Response> {
    ProjectId::from_str(raw)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

pub fn parse_user_id(raw: &str) -> Result<UserId, axum::response::Response> {
    UserId::from_str(raw).map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

/// Ids that arrive as JSON numbers rather than path segments.
pub fn user_id_from_raw(raw: i64) -> Result<UserId, axum::response::Response> {
    UserId::try_new(raw).map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

pub fn parse_permission(raw: &str) -> Result<Permission, axum::response::Response> {
    Permission::from_str(raw)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "unknown_permission", e.to_string()))
}

pub fn parse_role(raw: &str) -> Result<Role, axum::response::Response> {
    Role::from_str(raw).map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "unknown_role", e.to_string()))
}

// -------------------------
// Response mapping
// -------------------------

pub fn principal_to_json(principal: &Principal) -> serde_json::Value {
    serde_json::json!({
        "user_id": principal.id.get(),
        "username": principal.username,
        "display_name": principal.display_name,
        "role": principal.role.as_str(),
        "force_password_reset": principal.force_password_reset,
        "capabilities": principal.capabilities,
    })
}

pub fn grant_to_json(grant: &PermissionGrant) -> serde_json::Value {
    serde_json::json!({
        "id": grant.id.to_string(),
        "project_id": grant.project_id.get(),
        "user_id": grant.user_id.get(),
        "permission": grant.permission.as_str(),
        "granted_by": grant.granted_by.get(),
        "granted_at": grant.granted_at.to_rfc3339(),
        "expires_at": grant.expires_at.map(|d| d.to_rfc3339()),
        "is_active": grant.is_active,
        "notes": grant.notes,
    })
}

/// Session history entry; never includes the token.
pub fn session_to_json(session: &Session) -> serde_json::Value {
    serde_json::json!({
        "id": session.id.to_string(),
        "user_agent": session.user_agent,
        "client_ip": session.client_ip,
        "geo_location": session.geo_location,
        "created_at": session.created_at.to_rfc3339(),
        "last_activity_at": session.last_activity_at.to_rfc3339(),
        "active": session.active,
        "ended_at": session.ended_at.map(|d| d.to_rfc3339()),
        "end_reason": session.end_reason.map(|r| r.as_str()),
    })
}
