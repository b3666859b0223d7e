//! Collective transport seam
//!
//! The driver needs three things from a cluster: phase barriers, a
//! rank-ordered gather to rank 0, and a positional reader for the shared
//! file. Implementations decide how those map onto real plumbing; the
//! in-process [`crate::LocalCluster`] maps them onto tokio primitives.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use mtsum::{ReadAt, ReadError};

/// Collective operation failure. Fatal to the enclosing run.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("collective gather failed: {0}")]
    Gather(String),
    #[error("a rank dropped out of the collective")]
    Disconnected,
    #[error(transparent)]
    Open(#[from] ReadError),
}

/// One rank's handle to the collective.
#[async_trait]
pub trait Collective: Send + Sync {
    /// This rank's index in `0..world_size()`.
    fn rank(&self) -> usize;

    /// Total number of ranks.
    fn world_size(&self) -> usize;

    /// Block until every rank has arrived.
    async fn barrier(&self) -> Result<(), TransportError>;

    /// Deliver every rank's payload to rank 0, concatenated in rank order.
    ///
    /// All payloads must have equal length. Returns `Some` on rank 0 and
    /// `None` everywhere else.
    async fn gather(&self, payload: Vec<u8>) -> Result<Option<Vec<u8>>, TransportError>;

    /// Open the shared input file through the transport's I/O path.
    ///
    /// All ranks call this collectively. The returned reader serves the
    /// engine's positional block reads for this rank's range.
    fn open(&self, path: &Path) -> Result<Arc<dyn ReadAt>, TransportError>;
}
