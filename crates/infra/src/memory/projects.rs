use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use qaflow_auth::{ProjectDirectory, ProjectRecord, StoreError, TeamAssignment, TeamRole};
use qaflow_core::{ProjectId, UserId};

use super::poisoned;

/// Project designations plus soft-deletable team assignments.
#[derive(Debug, Default)]
pub struct InMemoryProjectDirectory {
    projects: RwLock<BTreeMap<ProjectId, ProjectRecord>>,
    assignments: RwLock<Vec<TeamAssignment>>,
}

impl InMemoryProjectDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Insert or replace a project record.
    pub fn add_project(&self, record: ProjectRecord) -> Result<(), StoreError> {
        let mut projects = self.projects.write().map_err(poisoned)?;
        projects.insert(record.id, record);
        Ok(())
    }

    pub fn set_lead(&self, project_id: ProjectId, lead: Option<UserId>) -> Result<bool, StoreError> {
        let mut projects = self.projects.write().map_err(poisoned)?;
        Ok(projects
            .get_mut(&project_id)
            .map(|p| p.project_lead_id = lead)
            .is_some())
    }

    /// Assign a team role; re-assigning a removed role restores it.
    pub fn assign(&self, project_id: ProjectId, user_id: UserId, role: TeamRole) -> Result<(), StoreError> {
        let mut assignments = self.assignments.write().map_err(poisoned)?;
        match assignments
            .iter_mut()
            .find(|a| a.project_id == project_id && a.user_id == user_id && a.role == role)
        {
            Some(existing) => existing.is_removed = false,
            None => assignments.push(TeamAssignment {
                project_id,
                user_id,
                role,
                is_removed: false,
            }),
        }
        Ok(())
    }

    /// Soft-remove an assignment. Returns `false` if nothing was active.
    pub fn remove_assignment(&self, project_id: ProjectId, user_id: UserId, role: TeamRole) -> Result<bool, StoreError> {
        let mut assignments = self.assignments.write().map_err(poisoned)?;
        let mut removed = false;
        for a in assignments
            .iter_mut()
            .filter(|a| a.project_id == project_id && a.user_id == user_id && a.role == role && !a.is_removed)
        {
            a.is_removed = true;
            removed = true;
        }
        Ok(removed)
    }
}

impl ProjectDirectory for InMemoryProjectDirectory {
    fn project(&self, id: ProjectId) -> Result<Option<ProjectRecord>, StoreError> {
        let projects = self.projects.read().map_err(poisoned)?;
        Ok(projects.get(&id).cloned())
    }

    fn all_projects(&self) -> Result<Vec<ProjectId>, StoreError> {
        let projects = self.projects.read().map_err(poisoned)?;
        Ok(projects.keys().copied().collect())
    }

    fn projects_led_or_created_by(&self, user_id: UserId) -> Result<Vec<ProjectId>, StoreError> {
        let projects = self.projects.read().map_err(poisoned)?;
        Ok(projects
            .values()
            .filter(|p| p.project_lead_id == Some(user_id) || p.created_by == user_id)
            .map(|p| p.id)
            .collect())
    }

    fn team_assignments(&self, project_id: ProjectId, user_id: UserId) -> Result<Vec<TeamAssignment>, StoreError> {
        let assignments = self.assignments.read().map_err(poisoned)?;
        Ok(assignments
            .iter()
            .filter(|a| a.project_id == project_id && a.user_id == user_id)
            .cloned()
            .collect())
    }

    fn assignments_for_user(&self, user_id: UserId) -> Result<Vec<TeamAssignment>, StoreError> {
        let assignments = self.assignments.read().map_err(poisoned)?;
        Ok(assignments.iter().filter(|a| a.user_id == user_id).cloned().collect())
    }
}
