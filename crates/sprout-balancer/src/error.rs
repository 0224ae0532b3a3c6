//! Balancer client error types.

use thiserror::Error;

/// Result type alias for balancer operations.
pub type BalancerResult<T> = Result<T, BalancerError>;

/// Errors that can occur when talking to the balancer admin API.
#[derive(Debug, Error)]
pub enum BalancerError {
    /// Transport-level failure: connection refused, timeout, bad TLS,
    /// or a response body that could not be decoded.
    #[error("balancer request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The admin API answered with a non-success status.
    #[error("balancer API returned {status}: {body}")]
    Api { status: u16, body: String },
}
