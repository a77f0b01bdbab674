//! `qaflow-auth`: the authorization and session lifecycle engine.
//!
//! Decoupled from HTTP and from any concrete storage: persistence is reached
//! through the traits in [`store`], and decisions are returned as values
//! ([`Decision`], [`SessionError`]) for the consumer to map onto its transport.

pub mod audit;
pub mod authorize;
pub mod config;
pub mod error;
pub mod gate;
pub mod grants;
pub mod hierarchy;
pub mod lifecycle;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod resolver;
pub mod roles;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod token;

pub use audit::{AuditAction, AuditEntry, AuditSink, TracingAuditSink};
pub use authorize::{Decision, Denial, DenialKind, PermissionExplanation, PrecedenceLayer};
pub use config::{AuthConfig, PasswordParams};
pub use error::AuthError;
pub use gate::{EngineStores, RequestGate};
pub use grants::{GrantRequest, PermissionGrant, ProjectRecord, TeamAssignment};
pub use hierarchy::{RoleHierarchyAuthorizer, RoleRanks, RoleRequirement};
pub use lifecycle::{AuthContext, LoginOutcome, LoginRequest, SessionLifecycleManager};
pub use password::CredentialVerifier;
pub use permissions::Permission;
pub use principal::{Capabilities, Principal, PrincipalRecord};
pub use resolver::ProjectPermissionResolver;
pub use roles::{Role, TeamRole};
pub use session::{ClientInfo, EndReason, Session, SessionError, SessionState, SessionToken};
pub use store::{GrantStore, PrincipalDirectory, ProjectDirectory, SessionCache, SessionStore, StoreError};
pub use telemetry::{GeoLocator, LoginTelemetry, NoGeoLocator, TelemetryDispatcher};
pub use token::generate_session_token;
