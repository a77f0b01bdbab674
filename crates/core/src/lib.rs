//! `qaflow-core`: shared primitives for the authorization engine.
//!
//! This crate contains **pure** building blocks (no storage, no transport).

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{GrantId, ProjectId, SessionId, UserId};
