use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use qaflow_auth::{Decision, Denial, RequestGate, Role, RoleRequirement, SessionToken};

use crate::app::errors;
use crate::context::{SessionCleared, SessionContext};

/// Session cookie name.
pub const SESSION_COOKIE: &str = "qaflow_session";

/// Carries a rotated token back to bearer-token clients.
pub const ROTATED_TOKEN_HEADER: &str = "x-session-token";

#[derive(Clone)]
pub struct AuthState {
    pub gate: Arc<RequestGate>,
}

/// Validate and refresh the session on every protected request.
///
/// Denials become a `303` to the login page with the cookie cleared; a rotated
/// token is re-issued on the way out.
pub async fn session_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = extract_token(req.headers());

    let auth = match state.gate.validate_and_refresh(token.as_ref()) {
        Ok(auth) => auth,
        Err(e) => return login_redirect(&state.gate.session_denial(&e)),
    };

    let rotated = auth.rotated_token().cloned();
    req.extensions_mut().insert(SessionContext::new(auth));

    let mut response = next.run(req).await;
    if let Some(token) = rotated {
        if response.extensions().get::<SessionCleared>().is_none() {
            attach_session(&mut response, &token);
        }
    }
    response
}

/// Route layer for `/admin`: `RequireRole(AtLeast(admin))`.
pub async fn require_admin(
    State(state): State<AuthState>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(session) = req.extensions().get::<SessionContext>() else {
        return errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "no session");
    };

    match state
        .gate
        .require_role(session.principal(), &RoleRequirement::AtLeast(Role::Admin))
    {
        Decision::Allow => next.run(req).await,
        Decision::Deny(denial) => errors::denial_to_response(&denial),
    }
}

/// Token from the session cookie, falling back to `Authorization: Bearer`.
pub fn extract_token(headers: &HeaderMap) -> Option<SessionToken> {
    cookie_token(headers).or_else(|| bearer_token(headers))
}

fn cookie_token(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| SessionToken::new(value))
}

fn bearer_token(headers: &HeaderMap) -> Option<SessionToken> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(SessionToken::new(token))
}

pub fn session_cookie(token: &SessionToken) -> String {
    format!("{SESSION_COOKIE}={}; HttpOnly; SameSite=Lax; Path=/", token.as_str())
}

pub fn cleared_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

/// Set the session cookie and the rotated-token header on a response.
pub fn attach_session(response: &mut Response, token: &SessionToken) {
    let headers = response.headers_mut();
    if let Ok(cookie) = HeaderValue::from_str(&session_cookie(token)) {
        headers.append(header::SET_COOKIE, cookie);
    }
    if let Ok(value) = HeaderValue::from_str(token.as_str()) {
        headers.insert(ROTATED_TOKEN_HEADER, value);
    }
}

fn login_redirect(denial: &Denial) -> Response {
    let location = denial.redirect_target.clone().unwrap_or_else(|| "/login".to_string());
    (
        StatusCode::SEE_OTHER,
        [(header::LOCATION, location), (header::SET_COOKIE, cleared_cookie())],
        Json(json!({
            "error": "session",
            "reason": denial.reason,
            "message": denial.message,
        })),
    )
        .into_response()
}
