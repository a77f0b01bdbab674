//! In-memory store implementations for tests, dev and single-node deployments.
//!
//! Each store guards its records with one lock, so every mutation is atomic
//! against its record. A poisoned lock surfaces as `StoreError::Unavailable`.

mod audit;
mod cache;
mod grants;
mod principals;
mod projects;
mod sessions;

use std::sync::PoisonError;

use qaflow_auth::StoreError;

pub use audit::RecordingAuditSink;
pub use cache::InMemorySessionCache;
pub use grants::InMemoryGrantStore;
pub use principals::InMemoryPrincipalDirectory;
pub use projects::InMemoryProjectDirectory;
pub use sessions::InMemorySessionStore;

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}
