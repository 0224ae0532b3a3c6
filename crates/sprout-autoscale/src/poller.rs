//! The poll/decide/act loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use sprout_balancer::BalancerApi;

use crate::config::Config;
use crate::policy::ScalingPolicy;
use crate::scaler::Scaler;
use crate::stats::StatsWindow;

/// The top-level controller task.
///
/// Owns the stats window and the scaler for the lifetime of the
/// process; both are mutated exclusively from this task, so nothing
/// here needs a lock. Every recoverable error collapses to "skip this
/// tick" — the controller relies on repeated sampling to converge.
pub struct Poller {
    client: Arc<dyn BalancerApi>,
    window: StatsWindow,
    scaler: Scaler,
    policy: ScalingPolicy,
    backend: String,
    interval: Duration,
    alpha: f64,
}

impl Poller {
    pub fn new(
        client: Arc<dyn BalancerApi>,
        scaler: Scaler,
        policy: ScalingPolicy,
        config: &Config,
        backend: impl Into<String>,
    ) -> Self {
        Self {
            client,
            window: StatsWindow::new(config.max_entries),
            scaler,
            policy,
            backend: backend.into(),
            interval: config.polling_interval,
            alpha: config.alpha(),
        }
    }

    /// One tick: fetch, record, decide, act.
    ///
    /// Failed fetches and missing backends consume no window slot, so
    /// samples always append in wall-clock order of successful fetches.
    pub async fn poll_once(&mut self) {
        let doc = match self.client.fetch_stats().await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "failed to fetch stats from balancer");
                return;
            }
        };

        let Some(rtime) = doc.backend_rtime(&self.backend) else {
            warn!(backend = %self.backend, "backend missing from stats document");
            return;
        };

        // The pre-scaling count: the value the decision is based on.
        let instances = self.scaler.count();
        self.window.push(rtime, instances, self.alpha);
        debug!(
            backend = %self.backend,
            rtime,
            ema = self.window.last_ema(),
            instances,
            "recorded sample"
        );

        let delta = self.policy.adjustment(&self.window, self.scaler.count());
        if delta != 0 {
            info!(delta, instances, "applying scaling adjustment");
            self.scaler.scale(delta).await;
        }
    }

    /// Run the loop until the shutdown signal flips.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            backend = %self.backend,
            interval_secs = self.interval.as_secs(),
            window = self.window.capacity(),
            "poller started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    self.poll_once().await;
                }
                _ = shutdown.changed() => {
                    info!("poller shutting down");
                    break;
                }
            }
        }
    }
}
