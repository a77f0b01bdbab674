use qaflow_auth::{AuthContext, Principal, Role, SessionToken};
use qaflow_core::UserId;

/// Authenticated session context for a request.
///
/// Inserted by the session middleware after a successful
/// validate-and-refresh; immutable for the rest of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    auth: AuthContext,
}

impl SessionContext {
    pub fn new(auth: AuthContext) -> Self {
        Self { auth }
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    pub fn principal(&self) -> &Principal {
        self.auth.principal()
    }

    pub fn user_id(&self) -> UserId {
        self.auth.user_id()
    }

    pub fn role(&self) -> Role {
        self.auth.role()
    }

    pub fn token(&self) -> &SessionToken {
        self.auth.token()
    }
}

/// Response marker: the handler ended the session, so the middleware must not
/// re-issue the session cookie.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SessionCleared;
