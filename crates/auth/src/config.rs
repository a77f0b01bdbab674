//! Engine configuration, loaded once at process start.

use chrono::Duration;

use crate::{AuthError, RoleRanks};

/// Argon2id cost parameters used for new hashes and the dummy comparison.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PasswordParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordParams {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// Immutable engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Inactivity after which a session expires (default: 30 minutes).
    pub idle_timeout: Duration,
    /// Token age after which it is re-issued; `None` disables rotation.
    pub rotation_interval: Option<Duration>,
    /// Rank table for hierarchy checks.
    pub role_ranks: RoleRanks,
    /// Redirect target for session denials.
    pub login_path: String,
    /// Redirect target for insufficient-role denials.
    pub role_denied_path: String,
    pub password: PasswordParams,
    /// Capacity of the login telemetry queue; events beyond it are dropped.
    pub telemetry_queue: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::minutes(30),
            rotation_interval: Some(Duration::minutes(15)),
            role_ranks: RoleRanks::standard(),
            login_path: "/login".to_string(),
            role_denied_path: "/dashboard".to_string(),
            password: PasswordParams::default(),
            telemetry_queue: 256,
        }
    }
}

impl AuthConfig {
    /// Load from process environment variables (`QAFLOW_*`).
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = parse_u64(&lookup, "QAFLOW_IDLE_TIMEOUT_SECS")? {
            if secs == 0 {
                return Err(AuthError::Config("QAFLOW_IDLE_TIMEOUT_SECS must be positive".to_string()));
            }
            config.idle_timeout = seconds(secs, "QAFLOW_IDLE_TIMEOUT_SECS")?;
        }

        if let Some(secs) = parse_u64(&lookup, "QAFLOW_SESSION_ROTATION_SECS")? {
            config.rotation_interval = match secs {
                0 => None,
                secs => Some(seconds(secs, "QAFLOW_SESSION_ROTATION_SECS")?),
            };
        }

        if let Some(order) = lookup("QAFLOW_ROLE_RANKS") {
            let names: Vec<&str> = order.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
            config.role_ranks = RoleRanks::from_names(&names)
                .map_err(|e| AuthError::Config(format!("QAFLOW_ROLE_RANKS: {e}")))?;
        }

        if let Some(path) = lookup("QAFLOW_LOGIN_PATH") {
            config.login_path = path;
        }
        if let Some(path) = lookup("QAFLOW_ROLE_DENIED_PATH") {
            config.role_denied_path = path;
        }

        if let Some(v) = parse_u64(&lookup, "QAFLOW_ARGON2_MEMORY_KIB")? {
            config.password.memory_kib = narrow(v, "QAFLOW_ARGON2_MEMORY_KIB")?;
        }
        if let Some(v) = parse_u64(&lookup, "QAFLOW_ARGON2_ITERATIONS")? {
            config.password.iterations = narrow(v, "QAFLOW_ARGON2_ITERATIONS")?;
        }
        if let Some(v) = parse_u64(&lookup, "QAFLOW_ARGON2_PARALLELISM")? {
            config.password.parallelism = narrow(v, "QAFLOW_ARGON2_PARALLELISM")?;
        }

        if let Some(v) = parse_u64(&lookup, "QAFLOW_TELEMETRY_QUEUE")? {
            config.telemetry_queue = usize::try_from(v)
                .map_err(|_| AuthError::Config("QAFLOW_TELEMETRY_QUEUE out of range".to_string()))?;
        }

        Ok(config)
    }
}

fn parse_u64<F>(lookup: &F, key: &str) -> Result<Option<u64>, AuthError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|e| AuthError::Config(format!("{key}: {e}")))
        })
        .transpose()
}

fn seconds(secs: u64, key: &str) -> Result<Duration, AuthError> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| AuthError::Config(format!("{key} out of range")))
}

fn narrow(value: u64, key: &str) -> Result<u32, AuthError> {
    u32::try_from(value).map_err(|_| AuthError::Config(format!("{key} out of range")))
}
