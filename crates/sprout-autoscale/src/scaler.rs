//! Roster bookkeeping and balancer command translation.

use std::sync::Arc;

use tracing::{info, warn};

use sprout_balancer::BalancerApi;

use crate::error::{ScalerError, ScalerResult};

/// Owns the authoritative list of live instance ids for one backend.
///
/// Ids are dense and 1-based: the roster is always `[1, 2, …, k]`.
/// Instance `id` is registered with the balancer as server
/// `java-service-<id>` on `localhost` at `base_port + id − 1`; worker
/// deployments rely on those exact values, so they are never rewritten.
///
/// The roster only advances on balancer-confirmed success, so it stays
/// consistent with the balancer through partial failures.
pub struct Scaler {
    client: Arc<dyn BalancerApi>,
    backend: String,
    base_port: u16,
    max_instances: usize,
    instances: Vec<u32>,
}

impl Scaler {
    /// Create a scaler with an empty roster, regardless of what the
    /// balancer currently holds. The owner is expected to purge the
    /// backend before the first `add_instance`.
    pub fn new(
        client: Arc<dyn BalancerApi>,
        backend: impl Into<String>,
        base_port: u16,
        max_instances: usize,
    ) -> Self {
        Self {
            client,
            backend: backend.into(),
            base_port,
            max_instances,
            instances: Vec::with_capacity(max_instances),
        }
    }

    fn server_name(id: u32) -> String {
        format!("java-service-{id}")
    }

    fn server_port(&self, id: u32) -> u16 {
        self.base_port + id as u16 - 1
    }

    /// Current roster size.
    pub fn count(&self) -> usize {
        self.instances.len()
    }

    /// Bind the next instance to the backend.
    ///
    /// The roster is untouched when the balancer rejects the command.
    pub async fn add_instance(&mut self) -> ScalerResult<()> {
        if self.instances.len() == self.max_instances {
            return Err(ScalerError::CapacityReached(self.max_instances));
        }

        let id = self.instances.len() as u32 + 1;
        let name = Self::server_name(id);
        self.client
            .bind_server(&self.backend, &name, "localhost", self.server_port(id))
            .await?;

        self.instances.push(id);
        info!(backend = %self.backend, server = %name, "added server to the backend");
        Ok(())
    }

    /// Remove the most recently added instance.
    ///
    /// A no-op success on an empty roster; the roster is untouched when
    /// the balancer rejects the command.
    pub async fn remove_instance(&mut self) -> ScalerResult<()> {
        let Some(&id) = self.instances.last() else {
            info!(backend = %self.backend, "no servers to remove from the backend");
            return Ok(());
        };

        let name = Self::server_name(id);
        self.client.delete_server(&self.backend, &name).await?;

        self.instances.pop();
        info!(backend = %self.backend, server = %name, "removed server from the backend");
        Ok(())
    }

    /// Apply a signed adjustment, one instance at a time.
    ///
    /// Stops at the first failure, keeping whatever steps already
    /// succeeded; the error is logged rather than propagated because
    /// the next polling tick re-evaluates from the new roster.
    pub async fn scale(&mut self, delta: i32) {
        if delta > 0 {
            for _ in 0..delta {
                if let Err(e) = self.add_instance().await {
                    warn!(error = %e, "failed to add instance");
                    break;
                }
            }
        } else if delta < 0 {
            for _ in 0..-delta {
                if let Err(e) = self.remove_instance().await {
                    warn!(error = %e, "failed to remove instance");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Command, MockBalancer};

    fn scaler_with(mock: &Arc<MockBalancer>, max: usize) -> Scaler {
        Scaler::new(mock.clone(), "service-backend", 8080, max)
    }

    #[tokio::test]
    async fn add_assigns_dense_ids_and_affine_ports() {
        let mock = MockBalancer::shared();
        let mut scaler = scaler_with(&mock, 5);

        scaler.add_instance().await.unwrap();
        scaler.add_instance().await.unwrap();
        scaler.add_instance().await.unwrap();

        assert_eq!(scaler.count(), 3);
        assert_eq!(
            mock.commands(),
            vec![
                Command::bind("service-backend", "java-service-1", "localhost", 8080),
                Command::bind("service-backend", "java-service-2", "localhost", 8081),
                Command::bind("service-backend", "java-service-3", "localhost", 8082),
            ]
        );
    }

    #[tokio::test]
    async fn add_at_capacity_fails_without_touching_the_balancer() {
        let mock = MockBalancer::shared();
        let mut scaler = scaler_with(&mock, 2);

        scaler.add_instance().await.unwrap();
        scaler.add_instance().await.unwrap();
        let err = scaler.add_instance().await.unwrap_err();

        assert!(matches!(err, ScalerError::CapacityReached(2)));
        assert_eq!(scaler.count(), 2);
        assert_eq!(mock.commands().len(), 2);
    }

    #[tokio::test]
    async fn remove_pops_the_last_instance() {
        let mock = MockBalancer::shared();
        let mut scaler = scaler_with(&mock, 5);

        scaler.add_instance().await.unwrap();
        scaler.add_instance().await.unwrap();
        scaler.remove_instance().await.unwrap();

        assert_eq!(scaler.count(), 1);
        assert_eq!(
            mock.commands().last().unwrap(),
            &Command::delete("service-backend", "java-service-2")
        );
    }

    #[tokio::test]
    async fn remove_on_empty_roster_is_a_no_op_success() {
        let mock = MockBalancer::shared();
        let mut scaler = scaler_with(&mock, 5);

        scaler.remove_instance().await.unwrap();
        assert_eq!(scaler.count(), 0);
        assert!(mock.commands().is_empty());
    }

    #[tokio::test]
    async fn failed_bind_leaves_the_roster_untouched() {
        let mock = MockBalancer::shared();
        mock.fail_binds_after(0);
        let mut scaler = scaler_with(&mock, 5);

        let err = scaler.add_instance().await.unwrap_err();
        assert!(matches!(err, ScalerError::Balancer(_)));
        assert_eq!(scaler.count(), 0);
    }

    #[tokio::test]
    async fn failed_delete_leaves_the_roster_untouched() {
        let mock = MockBalancer::shared();
        let mut scaler = scaler_with(&mock, 5);
        scaler.add_instance().await.unwrap();

        mock.fail_deletes();
        let err = scaler.remove_instance().await.unwrap_err();
        assert!(matches!(err, ScalerError::Balancer(_)));
        assert_eq!(scaler.count(), 1);
    }

    #[tokio::test]
    async fn scale_up_applies_the_full_delta() {
        let mock = MockBalancer::shared();
        let mut scaler = scaler_with(&mock, 5);

        scaler.scale(3).await;
        assert_eq!(scaler.count(), 3);
    }

    #[tokio::test]
    async fn scale_up_clamps_at_capacity() {
        let mock = MockBalancer::shared();
        let mut scaler = scaler_with(&mock, 5);
        scaler.add_instance().await.unwrap();

        // Asks for 7 with room for 4 more.
        scaler.scale(7).await;
        assert_eq!(scaler.count(), 5);
    }

    #[tokio::test]
    async fn scale_down_applies_the_full_delta() {
        let mock = MockBalancer::shared();
        let mut scaler = scaler_with(&mock, 5);
        scaler.scale(4).await;

        scaler.scale(-3).await;
        assert_eq!(scaler.count(), 1);
    }

    #[tokio::test]
    async fn scale_stops_at_first_failure_keeping_prior_steps() {
        let mock = MockBalancer::shared();
        let mut scaler = scaler_with(&mock, 5);
        scaler.add_instance().await.unwrap();

        // One more bind succeeds, then the balancer starts failing.
        mock.fail_binds_after(1);
        scaler.scale(3).await;

        // Grew by exactly the one confirmed instance.
        assert_eq!(scaler.count(), 2);
    }

    #[tokio::test]
    async fn scale_zero_is_a_no_op() {
        let mock = MockBalancer::shared();
        let mut scaler = scaler_with(&mock, 5);

        scaler.scale(0).await;
        assert!(mock.commands().is_empty());
    }

    #[tokio::test]
    async fn roster_stays_dense_through_churn() {
        let mock = MockBalancer::shared();
        let mut scaler = scaler_with(&mock, 5);

        scaler.scale(4).await;
        scaler.scale(-2).await;
        scaler.scale(1).await;

        // After removing 4 and 3, the next add reuses id 3.
        assert_eq!(scaler.count(), 3);
        assert_eq!(
            mock.commands().last().unwrap(),
            &Command::bind("service-backend", "java-service-3", "localhost", 8082)
        );
    }
}
