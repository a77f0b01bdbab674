//! Background maintenance: evicts idle sessions and deactivates expired
//! permission grants.
//!
//! Neither pass gates access. Validation checks idleness and the resolver
//! checks expiry on every request, so a late or failed sweep never widens
//! access; it only bounds the session cache and keeps grant rows tidy.

use std::io;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use qaflow_auth::{AuthError, RequestGate};

#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Time between sweeps.
    pub interval: Duration,
    /// Thread name, also used in logs.
    pub name: String,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            name: "maintenance-sweeper".to_string(),
        }
    }
}

impl SweeperConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Sweeper runtime statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SweeperStats {
    pub runs: u64,
    pub grants_deactivated: u64,
    pub sessions_evicted: u64,
    pub failures: u64,
    pub last_run_at: Option<DateTime<Utc>>,
    pub uptime_secs: u64,
}

/// Handle to a running sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<SweeperStats>>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for its thread.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }

    pub fn stats(&self) -> SweeperStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

/// Outcome of one maintenance pass.
#[derive(Debug)]
pub struct SweepReport {
    pub sessions_evicted: usize,
    pub grants_deactivated: Result<usize, AuthError>,
}

pub struct MaintenanceSweeper {
    gate: Arc<RequestGate>,
}

impl MaintenanceSweeper {
    pub fn new(gate: Arc<RequestGate>) -> Self {
        Self { gate }
    }

    /// Run one pass now. Session eviction cannot fail; the grant sweep can.
    pub fn run_once(&self) -> SweepReport {
        SweepReport {
            sessions_evicted: self.gate.evict_idle_sessions(),
            grants_deactivated: self.gate.sweep_expired_grants(),
        }
    }

    /// Sweep immediately, then every `config.interval`, on a background thread.
    pub fn spawn(self, config: SweeperConfig) -> io::Result<SweeperHandle> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let stats = Arc::new(Mutex::new(SweeperStats::default()));
        let stats_clone = stats.clone();

        let join = thread::Builder::new()
            .name(config.name.clone())
            .spawn(move || sweeper_loop(self, config, shutdown_rx, stats_clone))?;

        Ok(SweeperHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            stats,
        })
    }
}

fn sweeper_loop(
    sweeper: MaintenanceSweeper,
    config: SweeperConfig,
    shutdown_rx: mpsc::Receiver<()>,
    stats: Arc<Mutex<SweeperStats>>,
) {
    info!(sweeper = %config.name, interval_secs = config.interval.as_secs(), "maintenance sweeper started");
    let start_time = Instant::now();

    loop {
        let report = sweeper.run_once();
        if let Ok(mut s) = stats.lock() {
            s.runs += 1;
            s.last_run_at = Some(Utc::now());
            s.uptime_secs = start_time.elapsed().as_secs();
            s.sessions_evicted += report.sessions_evicted as u64;
            match &report.grants_deactivated {
                Ok(swept) => s.grants_deactivated += *swept as u64,
                Err(_) => s.failures += 1,
            }
        }
        match &report.grants_deactivated {
            Ok(swept) => debug!(
                sweeper = %config.name,
                swept,
                evicted = report.sessions_evicted,
                "sweep finished"
            ),
            Err(e) => warn!(sweeper = %config.name, error = %e, evicted = report.sessions_evicted, "grant sweep failed"),
        }

        match shutdown_rx.recv_timeout(config.interval) {
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    info!(sweeper = %config.name, "maintenance sweeper stopped");
}
