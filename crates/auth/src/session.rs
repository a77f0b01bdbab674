//! Session data contracts: the opaque token, the durable session row and the
//! ephemeral per-token state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use qaflow_core::{SessionId, UserId};

use crate::{Capabilities, Role};

/// Opaque, unguessable session token held by the client.
///
/// `Debug` and `Display` are redacted so tokens never reach logs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

impl core::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Why a session stopped being active.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Manual,
    IdleTimeout,
    AdminRevoked,
    AccountDeactivated,
    /// A new login from the same browser context replaced this session.
    Superseded,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Manual => "manual",
            EndReason::IdleTimeout => "idle_timeout",
            EndReason::AdminRevoked => "admin_revoked",
            EndReason::AccountDeactivated => "account_deactivated",
            EndReason::Superseded => "superseded",
        }
    }
}

/// Client details captured at login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub client_ip: Option<String>,
}

/// Durable session row (append-only history: inactive rows are never
/// reactivated or deleted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub session_token: SessionToken,
    pub user_id: UserId,
    pub user_agent: Option<String>,
    pub client_ip: Option<String>,
    /// Best-effort, non-authoritative.
    pub geo_location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub active: bool,
    pub ended_at: Option<DateTime<Utc>>,
    pub end_reason: Option<EndReason>,
}

impl Session {
    /// A fresh, active row.
    pub fn open(
        id: SessionId,
        session_token: SessionToken,
        user_id: UserId,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            session_token,
            user_id,
            user_agent: client.user_agent.clone(),
            client_ip: client.client_ip.clone(),
            geo_location: None,
            created_at: now,
            last_activity_at: now,
            active: true,
            ended_at: None,
            end_reason: None,
        }
    }
}

/// Ephemeral server-side state behind a token.
///
/// This is the cheap per-request cache the role/flag mirror writes into; the
/// durable [`Session`] row stays authoritative for revocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub token: SessionToken,
    pub session_id: SessionId,
    pub user_id: UserId,
    /// When the current token was issued (drives rotation).
    pub issued_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub role: Role,
    pub capabilities: Capabilities,
    pub force_password_reset: bool,
    pub client: ClientInfo,
}

/// Reason a request's session was not accepted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("no authenticated session")]
    Anonymous,

    #[error("session expired after inactivity")]
    IdleTimeout,

    #[error("session was revoked")]
    Revoked,

    #[error("account is deactivated")]
    Deactivated,

    /// The durable store could not be read; the request is denied.
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

impl SessionError {
    /// Stable reason code (used in redirects and audit entries).
    pub fn reason(&self) -> &'static str {
        match self {
            SessionError::Anonymous => "anonymous",
            SessionError::IdleTimeout => "idle_timeout",
            SessionError::Revoked => "revoked",
            SessionError::Deactivated => "deactivated",
            SessionError::Unavailable(_) => "unavailable",
        }
    }
}
