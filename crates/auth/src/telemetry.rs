//! Fire-and-forget login telemetry.
//!
//! Geolocation lookups may be slow or fail; they run on a dedicated worker
//! thread fed by a bounded queue so the login path never waits on them.

use std::sync::Arc;
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread;

use qaflow_core::UserId;

use crate::{SessionStore, SessionToken};

/// Best-effort IP → coarse location lookup.
pub trait GeoLocator: Send + Sync {
    fn locate(&self, client_ip: &str) -> Option<String>;
}

/// Locator that never resolves anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGeoLocator;

impl GeoLocator for NoGeoLocator {
    fn locate(&self, _client_ip: &str) -> Option<String> {
        None
    }
}

/// One login's telemetry payload.
#[derive(Debug, Clone)]
pub struct LoginTelemetry {
    pub token: SessionToken,
    pub user_id: UserId,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Handle to the telemetry worker.
///
/// Dropping every clone of the dispatcher closes the queue and lets the
/// worker exit.
#[derive(Debug, Clone)]
pub struct TelemetryDispatcher {
    tx: Option<SyncSender<LoginTelemetry>>,
}

impl TelemetryDispatcher {
    /// Start the worker thread.
    pub fn spawn(locator: Arc<dyn GeoLocator>, sessions: Arc<dyn SessionStore>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::sync_channel::<LoginTelemetry>(capacity.max(1));
        let spawned = thread::Builder::new()
            .name("qaflow-login-telemetry".to_string())
            .spawn(move || {
                for event in rx {
                    record_geo(locator.as_ref(), sessions.as_ref(), &event);
                }
                tracing::debug!("login telemetry worker stopped");
            });

        match spawned {
            Ok(_) => Self { tx: Some(tx) },
            Err(e) => {
                tracing::warn!(error = %e, "could not start login telemetry worker; telemetry disabled");
                Self::disabled()
            }
        }
    }

    /// A dispatcher that drops every event.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Queue an event without blocking. Returns whether it was queued.
    pub fn dispatch(&self, event: LoginTelemetry) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        match tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::debug!(user_id = %event.user_id, "telemetry queue full; event dropped");
                false
            }
            Err(TrySendError::Disconnected(event)) => {
                tracing::debug!(user_id = %event.user_id, "telemetry worker gone; event dropped");
                false
            }
        }
    }
}

fn record_geo(locator: &dyn GeoLocator, sessions: &dyn SessionStore, event: &LoginTelemetry) {
    let Some(ip) = event.client_ip.as_deref() else {
        return;
    };
    let Some(geo) = locator.locate(ip) else {
        return;
    };
    match sessions.record_geo(&event.token, event.user_id, &geo) {
        Ok(_) => tracing::debug!(user_id = %event.user_id, geo = %geo, "login geolocation recorded"),
        Err(e) => tracing::warn!(user_id = %event.user_id, error = %e, "failed to record login geolocation"),
    }
}
