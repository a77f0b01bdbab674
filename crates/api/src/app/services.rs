//! Engine wiring for the API process.
//!
//! Stores are the in-memory implementations from `qaflow-infra`; the request
//! gate is the only thing handlers talk to.

use std::sync::Arc;

use qaflow_auth::{
    AuthConfig, AuthError, Capabilities, EngineStores, GeoLocator, PrincipalDirectory, PrincipalRecord,
    ProjectRecord, RequestGate, Role, StoreError, TeamRole, TracingAuditSink,
};
use qaflow_core::{Clock, ProjectId, SystemClock, UserId};
use qaflow_infra::{
    InMemoryGrantStore, InMemoryPrincipalDirectory, InMemoryProjectDirectory, InMemorySessionCache,
    InMemorySessionStore, StaticGeoLocator,
};

/// A principal to create.
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub password: String,
}

pub struct AppServices {
    pub gate: Arc<RequestGate>,
    pub principals: Arc<InMemoryPrincipalDirectory>,
    pub projects: Arc<InMemoryProjectDirectory>,
}

impl AppServices {
    /// Wall clock, offline geolocation, audit to the log.
    pub fn build(config: AuthConfig) -> Result<Self, AuthError> {
        Self::build_with(config, Arc::new(SystemClock), Arc::new(StaticGeoLocator::new()))
    }

    pub fn build_with(config: AuthConfig, clock: Arc<dyn Clock>, geo: Arc<dyn GeoLocator>) -> Result<Self, AuthError> {
        let principals = InMemoryPrincipalDirectory::arc();
        let projects = InMemoryProjectDirectory::arc();
        let stores = EngineStores {
            sessions: InMemorySessionStore::arc(),
            cache: InMemorySessionCache::arc(),
            principals: principals.clone(),
            projects: projects.clone(),
            grants: InMemoryGrantStore::arc(),
            audit: Arc::new(TracingAuditSink),
        };
        let gate = Arc::new(RequestGate::new(config, stores, clock, geo)?);
        Ok(Self {
            gate,
            principals,
            projects,
        })
    }

    pub fn create_user(&self, user: NewUser) -> Result<UserId, AuthError> {
        let id = self.principals.next_id();
        let record = PrincipalRecord {
            id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            role: user.role,
            is_active: true,
            force_password_reset: false,
            capabilities: Capabilities {
                can_manage_devices: user.role.is_global_override(),
            },
            password_hash: self.gate.credentials().hash(&user.password)?,
        };
        self.principals.insert(record).map_err(conflict_as_validation)?;
        Ok(id)
    }

    /// Create the super admin named by the bootstrap settings unless a
    /// principal with that login already exists.
    pub fn bootstrap_admin(&self, username: &str, email: &str, password: &str) -> Result<UserId, AuthError> {
        if let Some(existing) = self.principals.find_by_login(username)? {
            tracing::info!(user_id = %existing.id, "bootstrap admin already present");
            return Ok(existing.id);
        }
        let id = self.create_user(NewUser {
            username: username.to_string(),
            email: email.to_string(),
            display_name: username.to_string(),
            role: Role::SuperAdmin,
            password: password.to_string(),
        })?;
        tracing::info!(user_id = %id, "bootstrap admin created");
        Ok(id)
    }

    pub fn add_project(&self, id: ProjectId, lead: Option<UserId>, created_by: UserId) -> Result<ProjectId, AuthError> {
        self.projects.add_project(ProjectRecord {
            id,
            project_lead_id: lead,
            created_by,
        })?;
        Ok(id)
    }

    pub fn assign(&self, project_id: ProjectId, user_id: UserId, role: TeamRole) -> Result<(), AuthError> {
        Ok(self.projects.assign(project_id, user_id, role)?)
    }
}

fn conflict_as_validation(err: StoreError) -> AuthError {
    match err {
        StoreError::Conflict(msg) => AuthError::Validation(msg),
        other => other.into(),
    }
}
