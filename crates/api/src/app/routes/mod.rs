use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::middleware::{self, AuthState};

pub mod admin;
pub mod auth;
pub mod projects;
pub mod system;

/// Router for all session-protected endpoints.
pub fn router(auth_state: AuthState) -> Router {
    Router::new()
        .route("/me", get(system::me))
        .route("/auth/logout", post(auth::logout))
        .route("/projects", get(projects::list_accessible))
        .route("/projects/:id/permissions", get(projects::list_permissions))
        .route("/projects/:id/permissions/:permission", get(projects::check_permission))
        .route("/projects/:id/permissions/:permission/explain", get(projects::explain_permission))
        .route("/projects/:id/grants", post(projects::grant_permission))
        .route("/projects/:id/grants/:user_id/:permission", delete(projects::revoke_permission))
        .nest(
            "/admin",
            admin::router().route_layer(axum::middleware::from_fn_with_state(auth_state, middleware::require_admin)),
        )
}
