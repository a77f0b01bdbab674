//! Session lifecycle: login, per-request validation/refresh, logout and
//! administrative revocation.
//!
//! State machine per token:
//! `ANONYMOUS → AUTHENTICATED → (REFRESHED)* → {LOGGED_OUT | IDLE_EXPIRED | REVOKED | DEACTIVATED}`.
//! Terminal states are absorbing: the durable row of an ended session is never
//! reactivated, so its token can never validate again.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use qaflow_core::{Clock, SessionId, UserId};

use crate::audit::{AuditAction, AuditEntry, AuditSink, record_best_effort};
use crate::telemetry::{LoginTelemetry, TelemetryDispatcher};
use crate::token::generate_session_token;
use crate::{
    AuthConfig, AuthError, ClientInfo, CredentialVerifier, EndReason, Principal, PrincipalDirectory, Role,
    Session, SessionCache, SessionError, SessionState, SessionStore, SessionToken,
};

/// Login input.
#[derive(Clone)]
pub struct LoginRequest {
    /// Username or email.
    pub identifier: String,
    pub password: String,
    pub client: ClientInfo,
    /// Token the client presented before logging in, if any. It is discarded,
    /// never reused.
    pub previous_token: Option<SessionToken>,
}

impl core::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("identifier", &self.identifier)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

/// Successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: SessionToken,
    pub session_id: SessionId,
    pub principal: Principal,
}

/// Per-request authenticated context.
///
/// Produced fresh by every successful validation and threaded explicitly
/// through request handling; the principal inside reflects the durable record
/// as of this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    principal: Principal,
    session_id: SessionId,
    token: SessionToken,
    rotated: bool,
    last_activity_at: DateTime<Utc>,
}

impl AuthContext {
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn user_id(&self) -> UserId {
        self.principal.id
    }

    pub fn role(&self) -> Role {
        self.principal.role
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Token valid after this request.
    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// The replacement token, if the token was rotated during this request.
    pub fn rotated_token(&self) -> Option<&SessionToken> {
        self.rotated.then_some(&self.token)
    }

    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }
}

pub struct SessionLifecycleManager {
    sessions: Arc<dyn SessionStore>,
    cache: Arc<dyn SessionCache>,
    principals: Arc<dyn PrincipalDirectory>,
    audit: Arc<dyn AuditSink>,
    telemetry: TelemetryDispatcher,
    credentials: CredentialVerifier,
    clock: Arc<dyn Clock>,
    idle_timeout: Duration,
    rotation_interval: Option<Duration>,
}

impl SessionLifecycleManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &AuthConfig,
        sessions: Arc<dyn SessionStore>,
        cache: Arc<dyn SessionCache>,
        principals: Arc<dyn PrincipalDirectory>,
        audit: Arc<dyn AuditSink>,
        telemetry: TelemetryDispatcher,
        credentials: CredentialVerifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions,
            cache,
            principals,
            audit,
            telemetry,
            credentials,
            clock,
            idle_timeout: config.idle_timeout,
            rotation_interval: config.rotation_interval,
        }
    }

    pub fn credentials(&self) -> &CredentialVerifier {
        &self.credentials
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authenticate
    // ─────────────────────────────────────────────────────────────────────────

    pub fn authenticate(&self, request: LoginRequest) -> Result<LoginOutcome, AuthError> {
        let now = self.clock.now();
        let identifier = request.identifier.trim();

        let record = self.principals.find_by_login(identifier)?;
        let Some(record) = record else {
            self.credentials.verify_dummy(&request.password);
            tracing::info!("login failed: unknown identifier");
            self.audit(AuditEntry::new(now, AuditAction::LoginFailed, None, "unknown identifier"));
            return Err(AuthError::InvalidCredentials);
        };

        if !self.credentials.verify(&request.password, &record.password_hash) {
            tracing::info!(user_id = %record.id, "login failed: password mismatch");
            self.audit(AuditEntry::new(now, AuditAction::LoginFailed, Some(record.id), "password mismatch"));
            return Err(AuthError::InvalidCredentials);
        }

        if !record.is_active {
            tracing::info!(user_id = %record.id, "login refused: account inactive");
            self.audit(AuditEntry::new(now, AuditAction::LoginFailed, Some(record.id), "account inactive"));
            return Err(AuthError::AccountInactive);
        }

        if let Some(previous) = &request.previous_token {
            self.discard_previous(previous, now);
        }

        let token = generate_session_token();
        let session_id = SessionId::new();
        self.cache.put(SessionState {
            token: token.clone(),
            session_id,
            user_id: record.id,
            issued_at: now,
            last_activity_at: now,
            role: record.role,
            capabilities: record.capabilities,
            force_password_reset: record.force_password_reset,
            client: request.client.clone(),
        });

        let row = Session::open(session_id, token.clone(), record.id, &request.client, now);
        if let Err(e) = self.sessions.insert(row) {
            // Validation recreates the row on the next request.
            tracing::warn!(user_id = %record.id, error = %e, "failed to persist session row at login");
        }

        tracing::info!(user_id = %record.id, session_id = %session_id, role = %record.role, "login succeeded");
        self.audit(AuditEntry::new(now, AuditAction::Login, Some(record.id), format!("session {session_id}")));

        self.telemetry.dispatch(LoginTelemetry {
            token: token.clone(),
            user_id: record.id,
            client_ip: request.client.client_ip.clone(),
            user_agent: request.client.user_agent.clone(),
        });

        Ok(LoginOutcome {
            token,
            session_id,
            principal: Principal::from(&record),
        })
    }

    fn discard_previous(&self, previous: &SessionToken, now: DateTime<Utc>) {
        let Some(old) = self.cache.remove(previous) else {
            return;
        };
        self.end_best_effort(previous, old.user_id, EndReason::Superseded, now);
        tracing::info!(user_id = %old.user_id, session_id = %old.session_id, "previous session superseded by new login");
        self.audit(AuditEntry::new(
            now,
            AuditAction::SessionSuperseded,
            Some(old.user_id),
            format!("session {}", old.session_id),
        ));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validate and refresh
    // ─────────────────────────────────────────────────────────────────────────

    /// Check the session behind `token` and refresh it.
    ///
    /// Steps run strictly in order: idle check, durable row check, principal
    /// check (with role/flag mirroring), then the activity touch.
    pub fn validate_and_refresh(&self, token: Option<&SessionToken>) -> Result<AuthContext, SessionError> {
        let Some(token) = token else {
            return Err(SessionError::Anonymous);
        };
        let Some(mut state) = self.cache.get(token) else {
            return Err(SessionError::Anonymous);
        };
        let now = self.clock.now();
        let user_id = state.user_id;

        if now - state.last_activity_at > self.idle_timeout {
            self.cache.remove(token);
            self.end_best_effort(token, user_id, EndReason::IdleTimeout, now);
            tracing::info!(user_id = %user_id, session_id = %state.session_id, "session expired after inactivity");
            self.audit(AuditEntry::new(
                now,
                AuditAction::IdleTimeout,
                Some(user_id),
                format!("session {}", state.session_id),
            ));
            return Err(SessionError::IdleTimeout);
        }

        let row = self.sessions.find(token, user_id).map_err(|e| {
            tracing::warn!(user_id = %user_id, error = %e, "session store read failed; denying");
            SessionError::Unavailable(e.to_string())
        })?;
        match row {
            None => {
                let sibling = self.sessions.find_by_id(state.session_id, user_id).map_err(|e| {
                    tracing::warn!(user_id = %user_id, error = %e, "session store read failed; denying");
                    SessionError::Unavailable(e.to_string())
                })?;
                if let Some(sibling) = sibling {
                    // The session lives on under a newer token (or has ended);
                    // this token must not come back.
                    self.cache.remove(token);
                    tracing::info!(
                        user_id = %user_id,
                        session_id = %sibling.id,
                        sibling_active = sibling.active,
                        "stale token for a re-keyed session; rejecting"
                    );
                    self.audit(AuditEntry::new(
                        now,
                        AuditAction::SessionRevoked,
                        Some(user_id),
                        format!("session {} re-keyed; stale token rejected", sibling.id),
                    ));
                    return Err(SessionError::Revoked);
                }
                self.self_heal(&state, now);
            }
            Some(row) if !row.active => {
                self.cache.remove(token);
                tracing::info!(
                    user_id = %user_id,
                    session_id = %row.id,
                    end_reason = ?row.end_reason,
                    "session no longer active; rejecting token"
                );
                self.audit(AuditEntry::new(
                    now,
                    AuditAction::SessionRevoked,
                    Some(user_id),
                    format!(
                        "session {} ended ({})",
                        row.id,
                        row.end_reason.map(|r| r.as_str()).unwrap_or("unknown")
                    ),
                ));
                return Err(SessionError::Revoked);
            }
            Some(_) => {}
        }

        let record = self.principals.get(user_id).map_err(|e| {
            tracing::warn!(user_id = %user_id, error = %e, "principal read failed; denying");
            SessionError::Unavailable(e.to_string())
        })?;
        let record = match record {
            Some(record) if record.is_active => record,
            _ => {
                self.cache.remove(token);
                self.end_best_effort(token, user_id, EndReason::AccountDeactivated, now);
                tracing::info!(user_id = %user_id, "account deactivated; session ended");
                self.audit(AuditEntry::new(
                    now,
                    AuditAction::AccountDeactivated,
                    Some(user_id),
                    format!("session {}", state.session_id),
                ));
                return Err(SessionError::Deactivated);
            }
        };

        state.role = record.role;
        state.capabilities = record.capabilities;
        state.force_password_reset = record.force_password_reset;

        if now > state.last_activity_at {
            state.last_activity_at = now;
        }
        let rotated = self.rotate_if_due(&mut state, now);

        if let Err(e) = self.sessions.touch(&state.token, user_id, state.last_activity_at) {
            tracing::warn!(user_id = %user_id, error = %e, "failed to record session activity");
        }

        let context = AuthContext {
            principal: Principal::from(&record),
            session_id: state.session_id,
            token: state.token.clone(),
            rotated,
            last_activity_at: state.last_activity_at,
        };
        self.cache.put(state);
        Ok(context)
    }

    /// Drop cache entries idle past the timeout and end their durable rows.
    ///
    /// Clients that never come back would otherwise pin their entries forever.
    pub fn evict_idle(&self) -> usize {
        let now = self.clock.now();
        let evicted = self.cache.evict_idle(now - self.idle_timeout);
        for state in &evicted {
            self.end_best_effort(&state.token, state.user_id, EndReason::IdleTimeout, now);
            self.audit(AuditEntry::new(
                now,
                AuditAction::IdleTimeout,
                Some(state.user_id),
                format!("session {} evicted", state.session_id),
            ));
        }
        if !evicted.is_empty() {
            tracing::info!(evicted = evicted.len(), "idle sessions evicted");
        }
        evicted.len()
    }

    /// Recreate a missing durable row for a token the cache still knows.
    ///
    /// Cannot elevate privilege: the role is re-read from the principal right
    /// after.
    fn self_heal(&self, state: &SessionState, now: DateTime<Utc>) {
        let row = Session::open(state.session_id, state.token.clone(), state.user_id, &state.client, now);
        match self.sessions.insert(row) {
            Ok(()) => tracing::info!(
                user_id = %state.user_id,
                session_id = %state.session_id,
                "durable session row missing; recreated"
            ),
            Err(e) => tracing::warn!(
                user_id = %state.user_id,
                error = %e,
                "durable session row missing and could not be recreated"
            ),
        }
    }

    fn rotate_if_due(&self, state: &mut SessionState, now: DateTime<Utc>) -> bool {
        let Some(interval) = self.rotation_interval else {
            return false;
        };
        if now - state.issued_at < interval {
            return false;
        }

        let fresh = generate_session_token();
        match self.sessions.rotate_token(&state.token, &fresh, state.user_id) {
            Ok(true) => {
                self.cache.remove(&state.token);
                state.token = fresh;
                state.issued_at = now;
                tracing::debug!(user_id = %state.user_id, session_id = %state.session_id, "session token rotated");
                true
            }
            Ok(false) => {
                tracing::debug!(user_id = %state.user_id, "no active row to re-key; rotation skipped");
                false
            }
            Err(e) => {
                tracing::warn!(user_id = %state.user_id, error = %e, "token rotation failed; keeping current token");
                false
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logout / revocation
    // ─────────────────────────────────────────────────────────────────────────

    /// End the session behind `token`. Unknown tokens are ignored.
    pub fn logout(&self, token: &SessionToken) {
        let Some(state) = self.cache.remove(token) else {
            return;
        };
        let now = self.clock.now();
        self.end_best_effort(token, state.user_id, EndReason::Manual, now);
        tracing::info!(user_id = %state.user_id, session_id = %state.session_id, "logout");
        self.audit(AuditEntry::new(
            now,
            AuditAction::Logout,
            Some(state.user_id),
            format!("session {}", state.session_id),
        ));
    }

    /// Deactivate every session of `user_id`; each is rejected as revoked on
    /// its next request.
    pub fn force_logout_all(&self, user_id: UserId, actor: Option<UserId>) -> Result<usize, AuthError> {
        let now = self.clock.now();
        let ended = self.sessions.end_all_for_user(user_id, EndReason::AdminRevoked, now)?;
        tracing::info!(user_id = %user_id, actor = ?actor, ended, "forced logout of all sessions");
        let mut entry = AuditEntry::new(now, AuditAction::ForceLogout, Some(user_id), format!("{ended} session(s) ended"));
        if let Some(actor) = actor {
            entry = entry.with_actor(actor);
        }
        self.audit(entry);
        Ok(ended)
    }

    /// Session history of a user, newest first.
    pub fn sessions_for(&self, user_id: UserId) -> Result<Vec<Session>, AuthError> {
        Ok(self.sessions.list_for_user(user_id)?)
    }

    fn end_best_effort(&self, token: &SessionToken, user_id: UserId, reason: EndReason, at: DateTime<Utc>) {
        if let Err(e) = self.sessions.end(token, user_id, reason, at) {
            tracing::warn!(user_id = %user_id, reason = reason.as_str(), error = %e, "failed to end durable session row");
        }
    }

    fn audit(&self, entry: AuditEntry) {
        record_best_effort(self.audit.as_ref(), entry);
    }
}

impl core::fmt::Debug for SessionLifecycleManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionLifecycleManager")
            .field("idle_timeout", &self.idle_timeout)
            .field("rotation_interval", &self.rotation_interval)
            .finish_non_exhaustive()
    }
}
