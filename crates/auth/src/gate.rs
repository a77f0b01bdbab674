//! Request Gate: the consumer-facing facade.
//!
//! Business code only talks to [`RequestGate`]. It composes the session
//! lifecycle, the role hierarchy and the project resolver into pass/fail
//! values; mapping a [`Denial`] onto HTTP is left to the caller.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Duration;

use qaflow_core::{Clock, ProjectId, UserId};

use crate::audit::{AuditAction, AuditEntry, AuditSink, record_best_effort};
use crate::lifecycle::{AuthContext, LoginOutcome, LoginRequest, SessionLifecycleManager};
use crate::permissions::LEAD_DENYLIST;
use crate::resolver::ProjectPermissionResolver;
use crate::telemetry::{GeoLocator, TelemetryDispatcher};
use crate::{
    AuthConfig, AuthError, CredentialVerifier, Decision, Denial, GrantRequest, GrantStore, Permission,
    PermissionExplanation, PermissionGrant, PrecedenceLayer, Principal, PrincipalDirectory, ProjectDirectory, Role,
    RoleHierarchyAuthorizer, RoleRequirement, Session, SessionCache, SessionError, SessionStore, SessionToken,
};

/// Every storage boundary the engine needs.
#[derive(Clone)]
pub struct EngineStores {
    pub sessions: Arc<dyn SessionStore>,
    pub cache: Arc<dyn SessionCache>,
    pub principals: Arc<dyn PrincipalDirectory>,
    pub projects: Arc<dyn ProjectDirectory>,
    pub grants: Arc<dyn GrantStore>,
    pub audit: Arc<dyn AuditSink>,
}

pub struct RequestGate {
    config: AuthConfig,
    lifecycle: SessionLifecycleManager,
    roles: RoleHierarchyAuthorizer,
    resolver: ProjectPermissionResolver,
    principals: Arc<dyn PrincipalDirectory>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl RequestGate {
    pub fn new(
        config: AuthConfig,
        stores: EngineStores,
        clock: Arc<dyn Clock>,
        geo: Arc<dyn GeoLocator>,
    ) -> Result<Self, AuthError> {
        let credentials = CredentialVerifier::new(config.password)?;
        let telemetry = TelemetryDispatcher::spawn(geo, stores.sessions.clone(), config.telemetry_queue);

        let lifecycle = SessionLifecycleManager::new(
            &config,
            stores.sessions,
            stores.cache,
            stores.principals.clone(),
            stores.audit.clone(),
            telemetry,
            credentials,
            clock.clone(),
        );
        let roles = RoleHierarchyAuthorizer::new(config.role_ranks.clone(), config.role_denied_path.clone());
        let resolver =
            ProjectPermissionResolver::new(stores.projects, stores.grants, stores.audit.clone(), clock.clone());

        tracing::info!(
            idle_timeout_secs = config.idle_timeout.num_seconds(),
            rotation_secs = ?config.rotation_interval.map(|d| d.num_seconds()),
            "request gate ready"
        );

        Ok(Self {
            config,
            lifecycle,
            roles,
            resolver,
            principals: stores.principals,
            audit: stores.audit,
            clock,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialVerifier {
        self.lifecycle.credentials()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn authenticate(&self, request: LoginRequest) -> Result<LoginOutcome, AuthError> {
        self.lifecycle.authenticate(request)
    }

    pub fn validate_and_refresh(&self, token: Option<&SessionToken>) -> Result<AuthContext, SessionError> {
        self.lifecycle.validate_and_refresh(token)
    }

    pub fn logout(&self, token: &SessionToken) {
        self.lifecycle.logout(token)
    }

    pub fn force_logout_all(&self, user_id: UserId, actor: Option<UserId>) -> Result<usize, AuthError> {
        self.lifecycle.force_logout_all(user_id, actor)
    }

    /// Evict sessions idle past the timeout; returns how many were ended.
    pub fn evict_idle_sessions(&self) -> usize {
        self.lifecycle.evict_idle()
    }

    pub fn sessions_for(&self, user_id: UserId) -> Result<Vec<Session>, AuthError> {
        self.lifecycle.sessions_for(user_id)
    }

    /// Map a session failure onto the login redirect.
    pub fn session_denial(&self, error: &SessionError) -> Denial {
        Denial::session(error, &self.config.login_path)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────────────────

    pub fn require_role(&self, principal: &Principal, requirement: &RoleRequirement) -> Decision {
        self.roles.require_role(principal, requirement)
    }

    /// Validate the session, then check the role requirement.
    pub fn require_role_or_deny(
        &self,
        token: Option<&SessionToken>,
        requirement: &RoleRequirement,
    ) -> Result<AuthContext, Denial> {
        let context = self
            .validate_and_refresh(token)
            .map_err(|e| self.session_denial(&e))?;
        self.require_role(context.principal(), requirement).into_result()?;
        Ok(context)
    }

    pub fn role_satisfies(&self, user_role: Role, requirement: &RoleRequirement) -> bool {
        self.roles.satisfies(user_role, requirement)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Project permissions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn has_project_permission(&self, principal: &Principal, project_id: ProjectId, permission: Permission) -> bool {
        self.resolver.has_permission(principal, project_id, permission)
    }

    pub fn has_any_project_permission(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        permissions: &[Permission],
    ) -> bool {
        self.resolver.has_any(principal, project_id, permissions)
    }

    pub fn has_all_project_permissions(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        permissions: &[Permission],
    ) -> bool {
        self.resolver.has_all(principal, project_id, permissions)
    }

    pub fn require_project_permission(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        permission: Permission,
    ) -> Decision {
        if self.has_project_permission(principal, project_id, permission) {
            Decision::Allow
        } else {
            tracing::info!(
                user_id = %principal.id,
                project_id = %project_id,
                permission = %permission,
                "project permission denied"
            );
            Decision::Deny(Denial::missing_permission(permission))
        }
    }

    pub fn project_permissions(
        &self,
        principal: &Principal,
        project_id: ProjectId,
    ) -> Result<BTreeSet<Permission>, AuthError> {
        Ok(self.resolver.all_permissions(principal, project_id)?)
    }

    /// Fail-closed existence check.
    pub fn has_project_access(&self, principal: &Principal, project_id: ProjectId) -> bool {
        self.resolver
            .has_project_access(principal, project_id)
            .unwrap_or_else(|e| {
                tracing::warn!(user_id = %principal.id, project_id = %project_id, error = %e, "project access lookup failed; denying");
                false
            })
    }

    pub fn accessible_projects(&self, principal: &Principal) -> Result<BTreeSet<ProjectId>, AuthError> {
        Ok(self.resolver.accessible_projects(principal)?)
    }

    pub fn explain_project_permission(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        permission: Permission,
    ) -> Result<PermissionExplanation, AuthError> {
        Ok(self.resolver.explain(principal, project_id, permission)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Grants
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant a permission on behalf of `request.granted_by`.
    ///
    /// Lead-denylisted permissions can only be handed out by a principal
    /// holding them through the global layer; otherwise a lead could grant
    /// them to itself through `permissions_manage`.
    pub fn grant(&self, request: GrantRequest) -> Result<PermissionGrant, AuthError> {
        if LEAD_DENYLIST.contains(&request.permission) {
            let granter = self
                .principals
                .get(request.granted_by)?
                .filter(|record| record.is_active)
                .map(|record| Principal::from(&record));
            let layer = match &granter {
                Some(granter) => self.resolver.resolve(granter, request.project_id, request.permission)?,
                None => None,
            };
            if layer != Some(PrecedenceLayer::Global) {
                tracing::warn!(
                    project_id = %request.project_id,
                    user_id = %request.user_id,
                    permission = %request.permission,
                    granted_by = %request.granted_by,
                    "grant of lead-denylisted permission refused"
                );
                return Err(AuthError::PermissionDenied {
                    permission: request.permission,
                });
            }
        }
        self.resolver.grant(request)
    }

    pub fn revoke(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        permission: Permission,
        actor: UserId,
    ) -> Result<bool, AuthError> {
        self.resolver.revoke(project_id, user_id, permission, actor)
    }

    pub fn sweep_expired_grants(&self) -> Result<usize, AuthError> {
        self.resolver.sweep_expired()
    }

    pub fn expiring_grants(&self, within: Duration) -> Result<Vec<PermissionGrant>, AuthError> {
        self.resolver.expiring_within(within)
    }

    pub fn grants_for_project(&self, project_id: ProjectId) -> Result<Vec<PermissionGrant>, AuthError> {
        self.resolver.grants_for_project(project_id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Principal administration
    // ─────────────────────────────────────────────────────────────────────────

    /// Flip the active flag. Open sessions of a deactivated user are rejected
    /// on their next request.
    ///
    /// The actor must rank at least as high as the target. Returns `false` for
    /// an unknown user.
    pub fn set_principal_active(&self, user_id: UserId, active: bool, actor: &Principal) -> Result<bool, AuthError> {
        let Some(target) = self.principals.get(user_id)? else {
            return Ok(false);
        };
        self.ensure_outranks(actor, target.role, "change the active flag of")?;

        let updated = self.principals.set_active(user_id, active)?;
        if updated {
            tracing::info!(user_id = %user_id, active, actor = %actor.id, "principal active flag changed");
            self.audit_principal_update(user_id, actor.id, format!("is_active={active}"));
        }
        Ok(updated)
    }

    /// Change the global role. Open sessions pick it up on their next request.
    ///
    /// The actor must rank at least as high as both the target's current role
    /// and the new one.
    pub fn set_principal_role(&self, user_id: UserId, role: Role, actor: &Principal) -> Result<bool, AuthError> {
        let Some(target) = self.principals.get(user_id)? else {
            return Ok(false);
        };
        self.ensure_outranks(actor, target.role, "change the role of")?;
        self.ensure_outranks(actor, role, "assign")?;

        let updated = self.principals.set_role(user_id, role)?;
        if updated {
            tracing::info!(user_id = %user_id, role = %role, actor = %actor.id, "principal role changed");
            self.audit_principal_update(user_id, actor.id, format!("role={role}"));
        }
        Ok(updated)
    }

    fn ensure_outranks(&self, actor: &Principal, role: Role, action: &str) -> Result<(), AuthError> {
        if self.roles.satisfies(actor.role, &RoleRequirement::AtLeast(role)) {
            return Ok(());
        }
        tracing::warn!(actor = %actor.id, actor_role = %actor.role, role = %role, "principal update refused: insufficient rank");
        Err(AuthError::Forbidden(format!("a {} cannot {action} a {role}", actor.role)))
    }

    fn audit_principal_update(&self, user_id: UserId, actor: UserId, detail: String) {
        record_best_effort(
            self.audit.as_ref(),
            AuditEntry::new(self.clock.now(), AuditAction::PrincipalUpdated, Some(user_id), detail).with_actor(actor),
        );
    }
}

impl core::fmt::Debug for RequestGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RequestGate")
            .field("config", &self.config)
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}
