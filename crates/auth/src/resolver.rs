//! Project-scoped permission resolution.
//!
//! Four precedence layers, evaluated short-circuit in fixed order:
//! 1. global override (admin / super_admin)
//! 2. project lead designation (minus [`LEAD_DENYLIST`](crate::permissions::LEAD_DENYLIST))
//! 3. team role basic permissions (non-removed assignments)
//! 4. explicit grant in force
//!
//! Grants are checked against the clock on every call; nothing here caches
//! a previous answer.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Duration;

use qaflow_core::{Clock, ProjectId, UserId};

use crate::audit::{AuditAction, AuditEntry, AuditSink, record_best_effort};
use crate::{
    AuthError, GrantRequest, GrantStore, Permission, PermissionExplanation, PermissionGrant, PrecedenceLayer,
    Principal, ProjectDirectory, StoreError,
};

pub struct ProjectPermissionResolver {
    projects: Arc<dyn ProjectDirectory>,
    grants: Arc<dyn GrantStore>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl ProjectPermissionResolver {
    pub fn new(
        projects: Arc<dyn ProjectDirectory>,
        grants: Arc<dyn GrantStore>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            projects,
            grants,
            audit,
            clock,
        }
    }

    /// The first layer granting `permission`, or `None`.
    pub fn resolve(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        permission: Permission,
    ) -> Result<Option<PrecedenceLayer>, StoreError> {
        if principal.role.is_global_override() {
            return Ok(Some(PrecedenceLayer::Global));
        }

        if permission.lead_may_exercise() {
            let project = self.projects.project(project_id)?;
            if project.is_some_and(|p| p.project_lead_id == Some(principal.id)) {
                return Ok(Some(PrecedenceLayer::ProjectLead));
            }
        }

        let assignments = self.projects.team_assignments(project_id, principal.id)?;
        if let Some(assignment) = assignments
            .iter()
            .find(|a| !a.is_removed && a.role.grants(permission))
        {
            return Ok(Some(PrecedenceLayer::TeamRole(assignment.role)));
        }

        let now = self.clock.now();
        let grant = self.grants.find(project_id, principal.id, permission)?;
        if grant.is_some_and(|g| g.is_in_force(now)) {
            return Ok(Some(PrecedenceLayer::ExplicitGrant));
        }

        Ok(None)
    }

    /// Fail-closed single-permission check.
    pub fn has_permission(&self, principal: &Principal, project_id: ProjectId, permission: Permission) -> bool {
        match self.resolve(principal, project_id, permission) {
            Ok(layer) => layer.is_some(),
            Err(e) => {
                tracing::warn!(
                    user_id = %principal.id,
                    project_id = %project_id,
                    permission = %permission,
                    error = %e,
                    "permission lookup failed; denying"
                );
                false
            }
        }
    }

    /// OR over [`has_permission`](Self::has_permission); `false` for an empty list.
    pub fn has_any(&self, principal: &Principal, project_id: ProjectId, permissions: &[Permission]) -> bool {
        permissions
            .iter()
            .any(|p| self.has_permission(principal, project_id, *p))
    }

    /// AND over [`has_permission`](Self::has_permission); `false` for an empty list.
    pub fn has_all(&self, principal: &Principal, project_id: ProjectId, permissions: &[Permission]) -> bool {
        !permissions.is_empty()
            && permissions
                .iter()
                .all(|p| self.has_permission(principal, project_id, *p))
    }

    /// Union of the permission sets of every applicable layer.
    pub fn all_permissions(
        &self,
        principal: &Principal,
        project_id: ProjectId,
    ) -> Result<BTreeSet<Permission>, StoreError> {
        if principal.role.is_global_override() {
            return Ok(Permission::ALL.iter().copied().collect());
        }

        let mut effective = BTreeSet::new();

        let project = self.projects.project(project_id)?;
        if project.is_some_and(|p| p.project_lead_id == Some(principal.id)) {
            effective.extend(Permission::ALL.iter().copied().filter(Permission::lead_may_exercise));
        }

        for assignment in self.projects.team_assignments(project_id, principal.id)? {
            if !assignment.is_removed {
                effective.extend(assignment.role.basic_permissions().iter().copied());
            }
        }

        let now = self.clock.now();
        effective.extend(
            self.grants
                .list_for(project_id, principal.id)?
                .into_iter()
                .filter(|g| g.is_in_force(now))
                .map(|g| g.permission),
        );

        Ok(effective)
    }

    /// Whether the user has any foothold on the project at all.
    pub fn has_project_access(&self, principal: &Principal, project_id: ProjectId) -> Result<bool, StoreError> {
        if principal.role.is_global_override() {
            return Ok(true);
        }

        if let Some(project) = self.projects.project(project_id)? {
            if project.project_lead_id == Some(principal.id) || project.created_by == principal.id {
                return Ok(true);
            }
        }

        if self
            .projects
            .team_assignments(project_id, principal.id)?
            .iter()
            .any(|a| !a.is_removed)
        {
            return Ok(true);
        }

        let now = self.clock.now();
        Ok(self
            .grants
            .list_for(project_id, principal.id)?
            .iter()
            .any(|g| g.is_in_force(now)))
    }

    pub fn accessible_projects(&self, principal: &Principal) -> Result<BTreeSet<ProjectId>, StoreError> {
        let mut projects: BTreeSet<ProjectId> = self
            .projects
            .projects_led_or_created_by(principal.id)?
            .into_iter()
            .collect();

        projects.extend(
            self.projects
                .assignments_for_user(principal.id)?
                .into_iter()
                .filter(|a| !a.is_removed)
                .map(|a| a.project_id),
        );

        let now = self.clock.now();
        projects.extend(
            self.grants
                .list_for_user(principal.id)?
                .into_iter()
                .filter(|g| g.is_in_force(now))
                .map(|g| g.project_id),
        );

        if principal.role.is_global_override() {
            projects.extend(self.projects.all_projects()?);
        }

        Ok(projects)
    }

    pub fn explain(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        permission: Permission,
    ) -> Result<PermissionExplanation, StoreError> {
        let layer = self.resolve(principal, project_id, permission)?;
        let effective = self.all_permissions(principal, project_id)?;
        Ok(PermissionExplanation::build(
            principal.id,
            principal.role,
            project_id,
            permission,
            layer,
            effective.into_iter().collect(),
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Grant management
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant (or re-grant) a permission. Re-granting reactivates the existing
    /// row and overwrites its metadata.
    pub fn grant(&self, request: GrantRequest) -> Result<PermissionGrant, AuthError> {
        let now = self.clock.now();
        if request.expires_at.is_some_and(|exp| exp <= now) {
            return Err(AuthError::Validation("expires_at must be in the future".to_string()));
        }

        let actor = request.granted_by;
        let grant = self.grants.upsert(request, now)?;
        tracing::info!(
            project_id = %grant.project_id,
            user_id = %grant.user_id,
            permission = %grant.permission,
            granted_by = %actor,
            expires_at = ?grant.expires_at,
            "permission granted"
        );
        record_best_effort(
            self.audit.as_ref(),
            AuditEntry::new(
                now,
                AuditAction::PermissionGranted,
                Some(grant.user_id),
                match grant.expires_at {
                    Some(exp) => format!("expires {}", exp.to_rfc3339()),
                    None => "no expiry".to_string(),
                },
            )
            .with_actor(actor)
            .with_project(grant.project_id, grant.permission),
        );
        Ok(grant)
    }

    /// Soft-revoke. Returns `false` if there was no active grant.
    pub fn revoke(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        permission: Permission,
        actor: UserId,
    ) -> Result<bool, AuthError> {
        let revoked = self.grants.revoke(project_id, user_id, permission)?;
        if revoked {
            tracing::info!(
                project_id = %project_id,
                user_id = %user_id,
                permission = %permission,
                revoked_by = %actor,
                "permission revoked"
            );
            record_best_effort(
                self.audit.as_ref(),
                AuditEntry::new(self.clock.now(), AuditAction::PermissionRevoked, Some(user_id), "revoked")
                    .with_actor(actor)
                    .with_project(project_id, permission),
            );
        }
        Ok(revoked)
    }

    /// Deactivate grants past their expiry. Bookkeeping only: resolution
    /// already ignores them.
    pub fn sweep_expired(&self) -> Result<usize, AuthError> {
        let now = self.clock.now();
        let swept = self.grants.deactivate_expired(now)?;
        if swept > 0 {
            tracing::info!(swept, "expired permission grants deactivated");
            record_best_effort(
                self.audit.as_ref(),
                AuditEntry::new(now, AuditAction::GrantsSwept, None, format!("{swept} grant(s) deactivated")),
            );
        }
        Ok(swept)
    }

    /// In-force grants expiring within `window` from now, soonest first.
    pub fn expiring_within(&self, window: Duration) -> Result<Vec<PermissionGrant>, AuthError> {
        Ok(self.grants.expiring_within(self.clock.now(), window)?)
    }

    pub fn grants_for_project(&self, project_id: ProjectId) -> Result<Vec<PermissionGrant>, AuthError> {
        Ok(self.grants.list_for_project(project_id)?)
    }
}

impl core::fmt::Debug for ProjectPermissionResolver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProjectPermissionResolver").finish_non_exhaustive()
    }
}
