use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use qaflow_auth::{AuthError, Denial, SessionError};

pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", "invalid username or password")
        }
        AuthError::AccountInactive => json_error(StatusCode::FORBIDDEN, "account_inactive", "account is inactive"),
        AuthError::Session(SessionError::Unavailable(msg)) | AuthError::StoreUnavailable(msg) => {
            tracing::warn!(error = %msg, "store unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", "service temporarily unavailable")
        }
        AuthError::Session(e) => json_error(StatusCode::UNAUTHORIZED, e.reason(), e.to_string()),
        AuthError::PermissionDenied { permission } => json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            format!("missing permission '{permission}'"),
        ),
        AuthError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
        AuthError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        AuthError::Config(msg) | AuthError::Crypto(msg) => {
            tracing::error!(error = %msg, "internal auth failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

/// Map a role/permission denial onto a JSON response with its status.
pub fn denial_to_response(denial: &Denial) -> axum::response::Response {
    let status = StatusCode::from_u16(denial.http_status).unwrap_or(StatusCode::FORBIDDEN);
    (
        status,
        Json(json!({
            "error": "forbidden",
            "kind": denial.kind,
            "message": denial.message,
            "redirect_target": denial.redirect_target,
        })),
    )
        .into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
