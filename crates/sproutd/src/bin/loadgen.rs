//! loadgen — ramping HTTP load generator for scaler experiments.
//!
//! Starts a batch of request workers against one URL and adds more on
//! a fixed ticker until the cap is reached. Each worker sends, logs
//! status and elapsed time, then sleeps its base delay plus random
//! jitter. Ctrl-C stops the ramp and the workers.

use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "loadgen", about = "Ramping HTTP load generator")]
struct Cli {
    /// Target URL.
    #[arg(long, default_value = "http://localhost/hello")]
    url: String,

    /// Workers started immediately.
    #[arg(long, default_value = "10")]
    initial_workers: usize,

    /// Workers added at each ramp step.
    #[arg(long, default_value = "10")]
    increment: usize,

    /// Upper bound on concurrent workers.
    #[arg(long, default_value = "200")]
    max_workers: usize,

    /// Base delay between a worker's requests, in milliseconds.
    #[arg(long, default_value = "1000")]
    base_delay_ms: u64,

    /// Seconds between ramp steps.
    #[arg(long, default_value = "10")]
    ramp_interval_secs: u64,
}

async fn send_requests(client: reqwest::Client, url: String, base_delay: Duration, id: usize) {
    loop {
        let started = Instant::now();
        match client.get(&url).send().await {
            Ok(resp) => info!(
                worker = id,
                status = %resp.status(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "request completed"
            ),
            Err(e) => warn!(worker = id, error = %e, "request failed"),
        }

        let jitter = base_delay.mul_f64(rand::random::<f64>());
        tokio::time::sleep(base_delay + jitter).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let base_delay = Duration::from_millis(cli.base_delay_ms);
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let mut workers = 0;
    for _ in 0..cli.initial_workers.min(cli.max_workers) {
        tokio::spawn(send_requests(
            client.clone(),
            cli.url.clone(),
            base_delay,
            workers,
        ));
        workers += 1;
    }
    info!(workers, url = %cli.url, "load generator started");

    let mut ticker = tokio::time::interval(Duration::from_secs(cli.ramp_interval_secs));
    ticker.tick().await; // first tick is immediate

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if workers >= cli.max_workers {
                    continue;
                }
                let batch = cli.increment.min(cli.max_workers - workers);
                for _ in 0..batch {
                    tokio::spawn(send_requests(
                        client.clone(),
                        cli.url.clone(),
                        base_delay,
                        workers,
                    ));
                    workers += 1;
                }
                info!(added = batch, workers, "ramped up");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}
