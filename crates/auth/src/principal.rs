use serde::{Deserialize, Serialize};

use qaflow_core::UserId;

use crate::Role;

/// Coarse, system-wide capability flags carried on the principal record.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_manage_devices: bool,
}

/// Durable user record as held by the principal directory.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub is_active: bool,
    pub force_password_reset: bool,
    pub capabilities: Capabilities,
    /// Argon2id PHC string.
    pub password_hash: String,
}

impl PrincipalRecord {
    /// Whether `identifier` names this principal (username exact, email
    /// case-insensitive).
    pub fn matches_login(&self, identifier: &str) -> bool {
        let identifier = identifier.trim();
        self.username == identifier || self.email.eq_ignore_ascii_case(identifier)
    }
}

impl core::fmt::Debug for PrincipalRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PrincipalRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("force_password_reset", &self.force_password_reset)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// Authorization view of a principal, as mirrored into a request's context.
///
/// Never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub force_password_reset: bool,
    pub capabilities: Capabilities,
}

impl From<&PrincipalRecord> for Principal {
    fn from(record: &PrincipalRecord) -> Self {
        Self {
            id: record.id,
            username: record.username.clone(),
            display_name: record.display_name.clone(),
            role: record.role,
            force_password_reset: record.force_password_reset,
            capabilities: record.capabilities,
        }
    }
}
