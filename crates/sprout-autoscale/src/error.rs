//! Scaler error types.

use thiserror::Error;

use sprout_balancer::BalancerError;

/// Result type alias for scaler operations.
pub type ScalerResult<T> = Result<T, ScalerError>;

/// Errors that can occur while adjusting the instance roster.
#[derive(Debug, Error)]
pub enum ScalerError {
    #[error("cannot add more instances, maximum of {0} reached")]
    CapacityReached(usize),

    #[error("balancer command failed: {0}")]
    Balancer(#[from] BalancerError),
}
