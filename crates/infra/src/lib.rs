//! Infrastructure layer: store implementations, geolocation and background
//! maintenance for the auth engine.

pub mod geo;
pub mod memory;
pub mod sweep;


pub use geo::StaticGeoLocator;
pub use memory::{
    InMemoryGrantStore, InMemoryPrincipalDirectory, InMemoryProjectDirectory, InMemorySessionCache,
    InMemorySessionStore, RecordingAuditSink,
};
pub use sweep::{MaintenanceSweeper, SweepReport, SweeperConfig, SweeperHandle, SweeperStats};
