use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use qaflow_auth::{PrincipalDirectory, PrincipalRecord, Role, StoreError};
use qaflow_core::UserId;

use super::poisoned;

/// User records; usernames and emails are unique (emails case-insensitively).
#[derive(Debug, Default)]
pub struct InMemoryPrincipalDirectory {
    records: RwLock<BTreeMap<UserId, PrincipalRecord>>,
}

impl InMemoryPrincipalDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Add a new record. Fails on a duplicate id, username or email.
    pub fn insert(&self, record: PrincipalRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        let clash = records.values().any(|r| {
            r.id == record.id || r.username == record.username || r.email.eq_ignore_ascii_case(&record.email)
        });
        if clash {
            return Err(StoreError::Conflict(format!(
                "principal '{}' conflicts with an existing record",
                record.username
            )));
        }
        records.insert(record.id, record);
        Ok(())
    }

    /// Insert or replace by id.
    pub fn upsert(&self, record: PrincipalRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.insert(record.id, record);
        Ok(())
    }

    pub fn next_id(&self) -> UserId {
        let next = self
            .records
            .read()
            .ok()
            .and_then(|r| r.keys().next_back().map(|id| id.get() + 1))
            .unwrap_or(1);
        UserId::new(next)
    }
}

impl PrincipalDirectory for InMemoryPrincipalDirectory {
    fn find_by_login(&self, identifier: &str) -> Result<Option<PrincipalRecord>, StoreError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.values().find(|r| r.matches_login(identifier)).cloned())
    }

    fn get(&self, id: UserId) -> Result<Option<PrincipalRecord>, StoreError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(&id).cloned())
    }

    fn set_active(&self, id: UserId, active: bool) -> Result<bool, StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        Ok(records.get_mut(&id).map(|r| r.is_active = active).is_some())
    }

    fn set_role(&self, id: UserId, role: Role) -> Result<bool, StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        Ok(records.get_mut(&id).map(|r| r.role = role).is_some())
    }
}
