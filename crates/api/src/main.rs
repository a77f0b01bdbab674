use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use qaflow_api::app::{AppServices, build_app};
use qaflow_auth::AuthConfig;
use qaflow_infra::{MaintenanceSweeper, SweeperConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    qaflow_observability::init();

    let config = AuthConfig::from_env().context("invalid auth configuration")?;
    let services = Arc::new(AppServices::build(config).context("failed to build engine")?);

    if let (Ok(username), Ok(email), Ok(password)) = (
        std::env::var("QAFLOW_BOOTSTRAP_ADMIN_USERNAME"),
        std::env::var("QAFLOW_BOOTSTRAP_ADMIN_EMAIL"),
        std::env::var("QAFLOW_BOOTSTRAP_ADMIN_PASSWORD"),
    ) {
        services
            .bootstrap_admin(&username, &email, &password)
            .context("failed to bootstrap admin")?;
    }

    let sweep_secs = match std::env::var("QAFLOW_SWEEP_SECS") {
        Ok(raw) => raw
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .with_context(|| format!("QAFLOW_SWEEP_SECS must be a positive integer, got '{raw}'"))?,
        Err(_) => 300,
    };
    let sweeper = MaintenanceSweeper::new(services.gate.clone())
        .spawn(SweeperConfig::default().with_interval(Duration::from_secs(sweep_secs)))
        .context("failed to start maintenance sweeper")?;

    let app = build_app(services);

    let bind = std::env::var("QAFLOW_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    let served = axum::serve(listener, app).await;
    sweeper.shutdown();
    served.context("server error")
}
