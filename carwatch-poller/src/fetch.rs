//! The upstream seam: anything that can fetch a snapshot for a channel.

use std::fmt::Debug;

use async_trait::async_trait;
use carwatch_types::{Channel, Snapshot};
use thiserror::Error;

/// Failure categories a fetcher reports.
///
/// Fetchers only say what the upstream answered. Whether a failure is
/// permanent is decided by the coordinator, which knows the channel history.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The account is not allowed to read this endpoint.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The upstream rate limit was hit.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The vehicle does not support this endpoint.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Any other failure: transport, decoding, server errors.
    #[error("remote error: {0}")]
    Remote(String),
}

/// Source of snapshots for one vehicle.
///
/// Implementations must be cheap to call repeatedly; the coordinator decides
/// when to call and serializes calls through the rate gate.
#[async_trait]
pub trait Fetcher: Send + Sync + Debug {
    /// Fetch the current snapshot for a channel.
    async fn fetch(&self, channel: Channel) -> Result<Snapshot, FetchError>;

    /// Human-readable description of where data comes from.
    fn description(&self) -> &str;
}
