//! sprout-balancer — HAProxy admin API client for SproutScaler.
//!
//! Wraps the subset of the Data Plane API the controller needs: binding
//! and deleting runtime servers in a backend, purging a backend, and
//! fetching the native stats document. The capability set is exposed as
//! the [`BalancerApi`] trait so the controller can be exercised against
//! a mock; [`DataPlaneClient`] is the HTTP implementation.

pub mod client;
pub mod error;
pub mod stats;

pub use client::{BalancerApi, DataPlaneClient};
pub use error::{BalancerError, BalancerResult};
pub use stats::NativeStats;
