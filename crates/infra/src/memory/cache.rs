use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use qaflow_auth::{SessionCache, SessionState, SessionToken};

/// Process-local token → session state map.
#[derive(Debug, Default)]
pub struct InMemorySessionCache {
    entries: RwLock<HashMap<SessionToken, SessionState>>,
}

impl InMemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionCache for InMemorySessionCache {
    fn get(&self, token: &SessionToken) -> Option<SessionState> {
        let entries = self.entries.read().ok()?;
        entries.get(token).cloned()
    }

    fn put(&self, state: SessionState) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(state.token.clone(), state);
        }
    }

    fn remove(&self, token: &SessionToken) -> Option<SessionState> {
        let mut entries = self.entries.write().ok()?;
        entries.remove(token)
    }

    fn evict_idle(&self, cutoff: DateTime<Utc>) -> Vec<SessionState> {
        let Ok(mut entries) = self.entries.write() else {
            return Vec::new();
        };
        let stale: Vec<SessionToken> = entries
            .values()
            .filter(|s| s.last_activity_at < cutoff)
            .map(|s| s.token.clone())
            .collect();
        stale.iter().filter_map(|token| entries.remove(token)).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use qaflow_auth::ClientInfo;
    use qaflow_core::{SessionId, UserId};

    use super::*;

    fn state(token: &str, last_activity_at: DateTime<Utc>) -> SessionState {
        SessionState {
            token: SessionToken::new(token),
            session_id: SessionId::new(),
            user_id: UserId::new(1),
            issued_at: last_activity_at,
            last_activity_at,
            role: qaflow_auth::Role::Qa,
            capabilities: Default::default(),
            force_password_reset: false,
            client: ClientInfo::default(),
        }
    }

    #[test]
    fn evict_idle_drops_only_entries_before_the_cutoff() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let cache = InMemorySessionCache::new();
        cache.put(state("stale", now - Duration::minutes(45)));
        cache.put(state("edge", now - Duration::minutes(30)));
        cache.put(state("fresh", now - Duration::minutes(1)));

        let evicted = cache.evict_idle(now - Duration::minutes(30));

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].token, SessionToken::new("stale"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&SessionToken::new("edge")).is_some());
        assert!(cache.evict_idle(now - Duration::minutes(30)).is_empty());
    }
}
