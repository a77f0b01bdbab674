use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::dto;
use crate::context::SessionContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /me - the authenticated principal, as mirrored on this request
pub async fn me(Extension(session): Extension<SessionContext>) -> impl IntoResponse {
    let mut body = dto::principal_to_json(session.principal());
    body["session_id"] = serde_json::Value::String(session.auth().session_id().to_string());
    Json(body)
}
