use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};

use qaflow_auth::{ClientInfo, LoginRequest};

use crate::app::{dto, errors, services::AppServices};
use crate::context::{SessionCleared, SessionContext};
use crate::middleware;

/// POST /auth/login - exchange credentials for a session
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Json(body): Json<dto::LoginRequest>,
) -> Response {
    let request = LoginRequest {
        identifier: body.identifier,
        password: body.password,
        client: client_info(&headers),
        previous_token: middleware::extract_token(&headers),
    };

    // Password hashing is CPU-bound; keep it off the async workers.
    let gate = services.gate.clone();
    let outcome = match tokio::task::spawn_blocking(move || gate.authenticate(request)).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => return errors::auth_error_to_response(e),
        Err(e) => {
            tracing::error!(error = %e, "login task failed");
            return errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error");
        }
    };

    let mut response = (
        StatusCode::OK,
        Json(serde_json::json!({
            "token": outcome.token.as_str(),
            "session_id": outcome.session_id.to_string(),
            "user_id": outcome.principal.id.get(),
            "role": outcome.principal.role.as_str(),
            "force_password_reset": outcome.principal.force_password_reset,
        })),
    )
        .into_response();
    middleware::attach_session(&mut response, &outcome.token);
    response
}

/// POST /auth/logout - end the current session and clear the cookie
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    services.gate.logout(session.token());
    let mut response = (
        StatusCode::OK,
        [(header::SET_COOKIE, middleware::cleared_cookie())],
        Json(serde_json::json!({ "logged_out": true })),
    )
        .into_response();
    response.extensions_mut().insert(SessionCleared);
    response
}

fn client_info(headers: &HeaderMap) -> ClientInfo {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let forwarded = header_str("x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty());

    ClientInfo {
        user_agent: header_str(header::USER_AGENT.as_str()),
        client_ip: forwarded.or_else(|| header_str("x-real-ip")),
    }
}
