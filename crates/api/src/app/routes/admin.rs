//! Administrative endpoints. Mounted under `/admin` behind `require_admin`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::Duration;

use crate::app::{dto, errors, services::AppServices};
use crate::context::SessionContext;

const DEFAULT_EXPIRING_DAYS: i64 = 7;
const MAX_EXPIRING_DAYS: i64 = 365;

pub fn router() -> Router {
    Router::new()
        .route("/users/:id/force-logout", post(force_logout))
        .route("/users/:id/active", put(set_active))
        .route("/users/:id/role", put(set_role))
        .route("/users/:id/sessions", get(list_sessions))
        .route("/grants/expiring", get(expiring_grants))
        .route("/grants/sweep", post(sweep_grants))
}

async fn force_logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Response {
    let user_id = match dto::parse_user_id(&id) {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    match services.gate.force_logout_all(user_id, Some(session.user_id())) {
        Ok(ended) => (StatusCode::OK, Json(serde_json::json!({ "user_id": user_id.get(), "ended": ended }))).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

async fn set_active(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetActiveRequest>,
) -> Response {
    let user_id = match dto::parse_user_id(&id) {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    match services.gate.set_principal_active(user_id, body.active, session.principal()) {
        Ok(true) => (
            StatusCode::OK,
            Json(serde_json::json!({ "user_id": user_id.get(), "active": body.active })),
        )
            .into_response(),
        Ok(false) => user_not_found(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

async fn set_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetRoleRequest>,
) -> Response {
    let user_id = match dto::parse_user_id(&id) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let role = match dto::parse_role(&body.role) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match services.gate.set_principal_role(user_id, role, session.principal()) {
        Ok(true) => (
            StatusCode::OK,
            Json(serde_json::json!({ "user_id": user_id.get(), "role": role.as_str() })),
        )
            .into_response(),
        Ok(false) => user_not_found(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

async fn list_sessions(Extension(services): Extension<Arc<AppServices>>, Path(id): Path<String>) -> Response {
    let user_id = match dto::parse_user_id(&id) {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    match services.gate.sessions_for(user_id) {
        Ok(sessions) => {
            let items: Vec<serde_json::Value> = sessions.iter().map(dto::session_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "user_id": user_id.get(), "sessions": items }))).into_response()
        }
        Err(e) => errors::auth_error_to_response(e),
    }
}

async fn expiring_grants(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ExpiringQuery>,
) -> Response {
    let days = query.days.unwrap_or(DEFAULT_EXPIRING_DAYS);
    if !(1..=MAX_EXPIRING_DAYS).contains(&days) {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_window",
            format!("days must be between 1 and {MAX_EXPIRING_DAYS}"),
        );
    }

    match services.gate.expiring_grants(Duration::days(days)) {
        Ok(grants) => {
            let items: Vec<serde_json::Value> = grants.iter().map(dto::grant_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "days": days, "grants": items }))).into_response()
        }
        Err(e) => errors::auth_error_to_response(e),
    }
}

async fn sweep_grants(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.gate.sweep_expired_grants() {
        Ok(swept) => (StatusCode::OK, Json(serde_json::json!({ "swept": swept }))).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

fn user_not_found() -> Response {
    errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found")
}
