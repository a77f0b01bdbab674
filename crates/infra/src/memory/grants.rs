use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};

use qaflow_auth::{GrantRequest, GrantStore, Permission, PermissionGrant, StoreError};
use qaflow_core::{GrantId, ProjectId, UserId};

use super::poisoned;

type GrantKey = (ProjectId, UserId, Permission);

/// Grant rows unique on `(project, user, permission)`.
#[derive(Debug, Default)]
pub struct InMemoryGrantStore {
    rows: RwLock<HashMap<GrantKey, PermissionGrant>>,
}

impl InMemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of rows, active or not.
    pub fn len(&self) -> usize {
        self.rows.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn collect<F>(&self, keep: F) -> Result<Vec<PermissionGrant>, StoreError>
    where
        F: Fn(&PermissionGrant) -> bool,
    {
        let rows = self.rows.read().map_err(poisoned)?;
        let mut grants: Vec<PermissionGrant> = rows.values().filter(|g| keep(g)).cloned().collect();
        grants.sort_by_key(|g| (g.project_id, g.user_id, g.permission));
        Ok(grants)
    }
}

impl GrantStore for InMemoryGrantStore {
    fn upsert(&self, request: GrantRequest, at: DateTime<Utc>) -> Result<PermissionGrant, StoreError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        let key = (request.project_id, request.user_id, request.permission);
        let grant = rows
            .entry(key)
            .and_modify(|g| {
                g.granted_by = request.granted_by;
                g.granted_at = at;
                g.expires_at = request.expires_at;
                g.notes = request.notes.clone();
                g.is_active = true;
            })
            .or_insert_with(|| PermissionGrant {
                id: GrantId::new(),
                project_id: request.project_id,
                user_id: request.user_id,
                permission: request.permission,
                granted_by: request.granted_by,
                granted_at: at,
                expires_at: request.expires_at,
                is_active: true,
                notes: request.notes.clone(),
            });
        Ok(grant.clone())
    }

    fn revoke(&self, project_id: ProjectId, user_id: UserId, permission: Permission) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        match rows.get_mut(&(project_id, user_id, permission)) {
            Some(g) if g.is_active => {
                g.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn find(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        permission: Permission,
    ) -> Result<Option<PermissionGrant>, StoreError> {
        let rows = self.rows.read().map_err(poisoned)?;
        Ok(rows.get(&(project_id, user_id, permission)).cloned())
    }

    fn list_for(&self, project_id: ProjectId, user_id: UserId) -> Result<Vec<PermissionGrant>, StoreError> {
        self.collect(|g| g.project_id == project_id && g.user_id == user_id)
    }

    fn list_for_user(&self, user_id: UserId) -> Result<Vec<PermissionGrant>, StoreError> {
        self.collect(|g| g.user_id == user_id)
    }

    fn list_for_project(&self, project_id: ProjectId) -> Result<Vec<PermissionGrant>, StoreError> {
        self.collect(|g| g.project_id == project_id)
    }

    fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        let mut swept = 0;
        for g in rows.values_mut() {
            if g.is_active && g.expires_at.is_some_and(|exp| exp <= now) {
                g.is_active = false;
                swept += 1;
            }
        }
        Ok(swept)
    }

    fn expiring_within(&self, now: DateTime<Utc>, window: Duration) -> Result<Vec<PermissionGrant>, StoreError> {
        let horizon = now + window;
        let rows = self.rows.read().map_err(poisoned)?;
        let mut grants: Vec<PermissionGrant> = rows
            .values()
            .filter(|g| g.is_active && g.expires_at.is_some_and(|exp| exp > now && exp <= horizon))
            .cloned()
            .collect();
        grants.sort_by_key(|g| g.expires_at);
        Ok(grants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(permission: Permission, expires_at: Option<DateTime<Utc>>) -> GrantRequest {
        GrantRequest {
            project_id: ProjectId::new(1),
            user_id: UserId::new(5),
            permission,
            granted_by: UserId::new(1),
            expires_at,
            notes: None,
        }
    }

    #[test]
    fn regrant_reactivates_the_same_row() {
        let store = InMemoryGrantStore::new();
        let now = Utc::now();
        let first = store.upsert(request(Permission::PagesCreate, None), now).unwrap();
        store.revoke(ProjectId::new(1), UserId::new(5), Permission::PagesCreate).unwrap();

        let mut again = request(Permission::PagesCreate, Some(now + Duration::days(3)));
        again.notes = Some("sprint 12".to_string());
        let second = store.upsert(again, now + Duration::hours(1)).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(first.id, second.id);
        assert!(second.is_active);
        assert_eq!(second.notes.as_deref(), Some("sprint 12"));
        assert_eq!(second.granted_at, now + Duration::hours(1));
    }

    #[test]
    fn revoke_reports_whether_an_active_row_changed() {
        let store = InMemoryGrantStore::new();
        store.upsert(request(Permission::Chat, None), Utc::now()).unwrap();
        assert!(store.revoke(ProjectId::new(1), UserId::new(5), Permission::Chat).unwrap());
        assert!(!store.revoke(ProjectId::new(1), UserId::new(5), Permission::Chat).unwrap());
        assert!(!store.revoke(ProjectId::new(1), UserId::new(5), Permission::HoursLog).unwrap());
    }

    #[test]
    fn sweep_and_expiry_window() {
        let store = InMemoryGrantStore::new();
        let now = Utc::now();
        store.upsert(request(Permission::PagesCreate, Some(now - Duration::hours(1))), now).unwrap();
        store.upsert(request(Permission::PagesEdit, Some(now + Duration::days(2))), now).unwrap();
        store.upsert(request(Permission::PagesView, Some(now + Duration::days(1))), now).unwrap();
        store.upsert(request(Permission::Chat, Some(now + Duration::days(30))), now).unwrap();
        store.upsert(request(Permission::HoursLog, None), now).unwrap();

        let soon = store.expiring_within(now, Duration::days(7)).unwrap();
        let perms: Vec<Permission> = soon.iter().map(|g| g.permission).collect();
        assert_eq!(perms, vec![Permission::PagesView, Permission::PagesEdit]);

        assert_eq!(store.deactivate_expired(now).unwrap(), 1);
        assert_eq!(store.deactivate_expired(now).unwrap(), 0);
        let swept = store.find(ProjectId::new(1), UserId::new(5), Permission::PagesCreate).unwrap().unwrap();
        assert!(!swept.is_active);
    }
}
