//! Distributed mtsum: partition a file across ranks, build per-rank trees,
//! fold the gathered roots into a global root on rank 0.
//!
//! The collective transport is a trait ([`Collective`]) so the driver stays
//! independent of how ranks actually talk to each other. [`LocalCluster`]
//! runs all ranks inside one process, which is what the `mtsum-cluster`
//! binary and the tests use.

pub mod driver;
pub mod local;
pub mod transport;

pub use driver::{fold_digests, ClusterDriver, ClusterError};
pub use local::LocalCluster;
pub use transport::{Collective, TransportError};
