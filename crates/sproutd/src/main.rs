//! sproutd — the SproutScaler daemon.
//!
//! Watches one HAProxy backend's average response time and grows or
//! shrinks its pool of worker servers to keep latency stable.
//!
//! # Usage
//!
//! ```text
//! sproutd --balancer-url http://localhost:5555 --backend service-backend
//! ```
//!
//! Controller tuning (window size, polling interval, sensitivities)
//! comes from environment variables; see `sprout_autoscale::Config`.

use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use sprout_autoscale::{Config, Poller, Scaler, ScalingPolicy};
use sprout_balancer::{BalancerApi, DataPlaneClient};

#[derive(Parser)]
#[command(name = "sproutd", about = "Latency-driven autoscaler for an HAProxy backend")]
struct Cli {
    /// Base URL of the balancer's Data Plane API.
    #[arg(long, default_value = "http://localhost:5555")]
    balancer_url: String,

    /// Admin API username.
    #[arg(long, default_value = "admin")]
    username: String,

    /// Admin API password.
    #[arg(long, default_value = "mypassword")]
    password: String,

    /// Backend whose latency is monitored and whose servers are scaled.
    #[arg(long, default_value = "service-backend")]
    backend: String,

    /// Port of the first worker; instance N listens on base-port + N − 1.
    #[arg(long, default_value = "8080")]
    base_port: u16,

    /// Upper bound on the number of worker instances.
    #[arg(long, default_value = "5")]
    max_instances: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "info,sproutd=debug,sprout_autoscale=debug,sprout_balancer=debug"
                        .parse()
                        .unwrap()
                }),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    // The stats fetch must resolve well inside a tick.
    let timeout = config.polling_interval / 2;
    let client = Arc::new(DataPlaneClient::new(
        &cli.balancer_url,
        &cli.username,
        &cli.password,
        timeout,
    )?);

    // Startup protocol: purge stale servers, register the first worker,
    // then start polling. The first sample then reflects a known roster;
    // if either step fails the balancer is fundamentally unavailable.
    client.delete_all_servers(&cli.backend).await?;
    info!(backend = %cli.backend, "purged existing servers from the backend");

    let mut scaler = Scaler::new(
        client.clone(),
        cli.backend.clone(),
        cli.base_port,
        cli.max_instances,
    );
    scaler.add_instance().await?;
    info!("registered the first worker instance");

    let policy = ScalingPolicy::new(config.base_sensitivity_up, config.base_sensitivity_down);
    let poller = Poller::new(client, scaler, policy, &config, cli.backend);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller_handle = tokio::spawn(poller.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    let _ = poller_handle.await;

    info!("sproutd stopped");
    Ok(())
}
