use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use qaflow_auth::{EndReason, Session, SessionStore, SessionToken, StoreError};
use qaflow_core::{SessionId, UserId};

use super::poisoned;

/// Durable session rows keyed by token (unique).
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    rows: RwLock<HashMap<SessionToken, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Drop a row outright (simulates a lost write or replication gap).
    pub fn forget(&self, token: &SessionToken) -> bool {
        self.rows
            .write()
            .map(|mut rows| rows.remove(token).is_some())
            .unwrap_or(false)
    }

    pub fn active_count(&self, user_id: UserId) -> usize {
        self.rows
            .read()
            .map(|rows| rows.values().filter(|s| s.user_id == user_id && s.active).count())
            .unwrap_or(0)
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert(&self, session: Session) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        rows.insert(session.session_token.clone(), session);
        Ok(())
    }

    fn find(&self, token: &SessionToken, user_id: UserId) -> Result<Option<Session>, StoreError> {
        let rows = self.rows.read().map_err(poisoned)?;
        Ok(rows.get(token).filter(|s| s.user_id == user_id).cloned())
    }

    fn find_by_id(&self, session_id: SessionId, user_id: UserId) -> Result<Option<Session>, StoreError> {
        let rows = self.rows.read().map_err(poisoned)?;
        Ok(rows
            .values()
            .find(|s| s.id == session_id && s.user_id == user_id)
            .cloned())
    }

    fn touch(&self, token: &SessionToken, user_id: UserId, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        match rows.get_mut(token) {
            Some(row) if row.user_id == user_id && row.active => {
                if at > row.last_activity_at {
                    row.last_activity_at = at;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn end(
        &self,
        token: &SessionToken,
        user_id: UserId,
        reason: EndReason,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        match rows.get_mut(token) {
            Some(row) if row.user_id == user_id && row.active => {
                row.active = false;
                row.ended_at = Some(at);
                row.end_reason = Some(reason);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn end_all_for_user(&self, user_id: UserId, reason: EndReason, at: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        let mut ended = 0;
        for row in rows.values_mut().filter(|s| s.user_id == user_id && s.active) {
            row.active = false;
            row.ended_at = Some(at);
            row.end_reason = Some(reason);
            ended += 1;
        }
        Ok(ended)
    }

    fn rotate_token(&self, old: &SessionToken, new: &SessionToken, user_id: UserId) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        if rows.contains_key(new) {
            return Err(StoreError::Conflict("session token already in use".to_string()));
        }
        let eligible = rows.get(old).is_some_and(|s| s.user_id == user_id && s.active);
        if !eligible {
            return Ok(false);
        }
        let Some(mut row) = rows.remove(old) else {
            return Ok(false);
        };
        row.session_token = new.clone();
        rows.insert(new.clone(), row);
        Ok(true)
    }

    fn record_geo(&self, token: &SessionToken, user_id: UserId, geo_location: &str) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        match rows.get_mut(token) {
            Some(row) if row.user_id == user_id => {
                row.geo_location = Some(geo_location.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn list_for_user(&self, user_id: UserId) -> Result<Vec<Session>, StoreError> {
        let rows = self.rows.read().map_err(poisoned)?;
        let mut sessions: Vec<Session> = rows.values().filter(|s| s.user_id == user_id).cloned().collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use qaflow_auth::ClientInfo;
    use qaflow_core::SessionId;

    use super::*;

    fn open(store: &InMemorySessionStore, token: &str, user: i64, at: DateTime<Utc>) -> SessionToken {
        let token = SessionToken::new(token);
        store
            .insert(Session::open(SessionId::new(), token.clone(), UserId::new(user), &ClientInfo::default(), at))
            .unwrap();
        token
    }

    #[test]
    fn touch_never_moves_activity_backwards() {
        let store = InMemorySessionStore::new();
        let t0 = Utc::now();
        let token = open(&store, "a", 1, t0);

        assert!(store.touch(&token, UserId::new(1), t0 + Duration::seconds(10)).unwrap());
        assert!(store.touch(&token, UserId::new(1), t0 + Duration::seconds(5)).unwrap());

        let row = store.find(&token, UserId::new(1)).unwrap().unwrap();
        assert_eq!(row.last_activity_at, t0 + Duration::seconds(10));
    }

    #[test]
    fn find_is_scoped_to_the_owning_user() {
        let store = InMemorySessionStore::new();
        let token = open(&store, "a", 1, Utc::now());
        assert!(store.find(&token, UserId::new(2)).unwrap().is_none());
    }

    #[test]
    fn ended_rows_stay_ended() {
        let store = InMemorySessionStore::new();
        let now = Utc::now();
        let token = open(&store, "a", 1, now);

        assert!(store.end(&token, UserId::new(1), EndReason::Manual, now).unwrap());
        assert!(!store.end(&token, UserId::new(1), EndReason::AdminRevoked, now).unwrap());
        assert!(!store.touch(&token, UserId::new(1), now).unwrap());

        let row = store.find(&token, UserId::new(1)).unwrap().unwrap();
        assert!(!row.active);
        assert_eq!(row.end_reason, Some(EndReason::Manual));
    }

    #[test]
    fn end_all_only_counts_active_rows() {
        let store = InMemorySessionStore::new();
        let now = Utc::now();
        let a = open(&store, "a", 1, now);
        open(&store, "b", 1, now);
        open(&store, "c", 2, now);
        store.end(&a, UserId::new(1), EndReason::Manual, now).unwrap();

        assert_eq!(store.end_all_for_user(UserId::new(1), EndReason::AdminRevoked, now).unwrap(), 1);
        assert_eq!(store.active_count(UserId::new(1)), 0);
        assert_eq!(store.active_count(UserId::new(2)), 1);
    }

    #[test]
    fn rotation_rekeys_the_active_row() {
        let store = InMemorySessionStore::new();
        let old = open(&store, "old", 1, Utc::now());
        let new = SessionToken::new("new");

        assert!(store.rotate_token(&old, &new, UserId::new(1)).unwrap());
        assert!(store.find(&old, UserId::new(1)).unwrap().is_none());
        let row = store.find(&new, UserId::new(1)).unwrap().unwrap();
        assert_eq!(row.session_token, new);

        assert!(!store.rotate_token(&old, &SessionToken::new("other"), UserId::new(1)).unwrap());
    }

    #[test]
    fn history_is_newest_first() {
        let store = InMemorySessionStore::new();
        let t0 = Utc::now();
        open(&store, "a", 1, t0);
        open(&store, "b", 1, t0 + Duration::minutes(1));

        let history = store.list_for_user(UserId::new(1)).unwrap();
        assert_eq!(history[0].session_token.as_str(), "b");
        assert_eq!(history[1].session_token.as_str(), "a");
    }
}
