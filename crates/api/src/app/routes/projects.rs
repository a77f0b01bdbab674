//! Project-scoped permission queries and grant management.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use qaflow_auth::{Decision, GrantRequest, Permission};

use crate::app::{dto, errors, services::AppServices};
use crate::context::SessionContext;

/// GET /projects - projects the caller can reach
pub async fn list_accessible(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    match services.gate.accessible_projects(session.principal()) {
        Ok(projects) => {
            let ids: Vec<i64> = projects.into_iter().map(|p| p.get()).collect();
            (StatusCode::OK, Json(serde_json::json!({ "projects": ids }))).into_response()
        }
        Err(e) => errors::auth_error_to_response(e),
    }
}

/// GET /projects/:id/permissions - effective permission set on a project
pub async fn list_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Response {
    let project_id = match dto::parse_project_id(&id) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.gate.project_permissions(session.principal(), project_id) {
        Ok(permissions) => {
            let names: Vec<&str> = permissions.iter().map(Permission::as_str).collect();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "project_id": project_id.get(),
                    "permissions": names,
                })),
            )
                .into_response()
        }
        Err(e) => errors::auth_error_to_response(e),
    }
}

/// GET /projects/:id/permissions/:permission - 200 if held, 403 otherwise
pub async fn check_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path((id, permission)): Path<(String, String)>,
) -> Response {
    let (project_id, permission) = match (dto::parse_project_id(&id), dto::parse_permission(&permission)) {
        (Ok(p), Ok(perm)) => (p, perm),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    match services
        .gate
        .require_project_permission(session.principal(), project_id, permission)
    {
        Decision::Allow => (
            StatusCode::OK,
            Json(serde_json::json!({
                "project_id": project_id.get(),
                "permission": permission.as_str(),
                "allowed": true,
            })),
        )
            .into_response(),
        Decision::Deny(denial) => errors::denial_to_response(&denial),
    }
}

/// GET /projects/:id/permissions/:permission/explain - why it was allowed or denied
pub async fn explain_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path((id, permission)): Path<(String, String)>,
) -> Response {
    let (project_id, permission) = match (dto::parse_project_id(&id), dto::parse_permission(&permission)) {
        (Ok(p), Ok(perm)) => (p, perm),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    match services
        .gate
        .explain_project_permission(session.principal(), project_id, permission)
    {
        Ok(explanation) => (StatusCode::OK, Json(serde_json::json!({ "explanation": explanation }))).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

/// POST /projects/:id/grants - grant a permission (requires `permissions_manage`)
pub async fn grant_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::GrantPermissionRequest>,
) -> Response {
    let project_id = match dto::parse_project_id(&id) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if let Decision::Deny(denial) =
        services
            .gate
            .require_project_permission(session.principal(), project_id, Permission::PermissionsManage)
    {
        return errors::denial_to_response(&denial);
    }

    let user_id = match dto::user_id_from_raw(body.user_id) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let permission = match dto::parse_permission(&body.permission) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let request = GrantRequest {
        project_id,
        user_id,
        permission,
        granted_by: session.user_id(),
        expires_at: body.expires_at,
        notes: body.notes,
    };
    match services.gate.grant(request) {
        Ok(grant) => (StatusCode::CREATED, Json(dto::grant_to_json(&grant))).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

/// DELETE /projects/:id/grants/:user_id/:permission - soft-revoke a grant
pub async fn revoke_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path((id, user_id, permission)): Path<(String, String, String)>,
) -> Response {
    let project_id = match dto::parse_project_id(&id) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if let Decision::Deny(denial) =
        services
            .gate
            .require_project_permission(session.principal(), project_id, Permission::PermissionsManage)
    {
        return errors::denial_to_response(&denial);
    }

    let (user_id, permission) = match (dto::parse_user_id(&user_id), dto::parse_permission(&permission)) {
        (Ok(u), Ok(p)) => (u, p),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    match services.gate.revoke(project_id, user_id, permission, session.user_id()) {
        Ok(revoked) => (StatusCode::OK, Json(serde_json::json!({ "revoked": revoked }))).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}
