//! Per-rank driver and global fold
//!
//! Each rank hashes its own slice of the file with the local engine, roots
//! are gathered to rank 0, and rank 0 folds them into the global tree using
//! the same balanced split that produced the rank partition. Because the
//! shapes coincide, the global root equals what a single-process run over a
//! tree of identical shape would print; changing the rank count changes the
//! shape and therefore the root.

use std::path::Path;
use tracing::{debug, info};

use mtsum::{partition, BuildError, BuilderConfig, HashAlgorithm, MerkleTree, Node, NodeKind, TreeBuilder};

use crate::transport::{Collective, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("number of ranks must be a power of two, got {0}")]
    WorldNotPow2(usize),
    #[error("file of {file_size} bytes is too small to distribute across {world} ranks")]
    FileTooSmall { file_size: u64, world: usize },
    #[error("gather delivered {got} bytes, expected {want}")]
    GatherSize { got: usize, want: usize },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Drives one rank of a distributed run.
pub struct ClusterDriver<T: Collective> {
    transport: T,
    config: BuilderConfig,
}

impl<T: Collective> ClusterDriver<T> {
    pub fn new(transport: T, config: BuilderConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run this rank's share of the computation.
    ///
    /// Returns the populated global tree on rank 0 and `None` on every
    /// other rank. The first failure on any code path aborts the run.
    pub async fn run(&self, path: &Path, file_size: u64) -> Result<Option<MerkleTree>, ClusterError> {
        let world = self.transport.world_size();
        let rank = self.transport.rank();

        if !world.is_power_of_two() {
            return Err(ClusterError::WorldNotPow2(world));
        }
        if file_size / (world as u64) < self.config.balance_threshold {
            return Err(ClusterError::FileTooSmall { file_size, world });
        }

        let parts = partition::partition_ranks(file_size, world, self.config.block_size);
        let (offset, size) = parts[rank];
        debug!(rank, world, offset, size, "rank partition assigned");

        self.transport.barrier().await?;

        let reader = self.transport.open(path)?;
        let builder = TreeBuilder::new(self.config.clone());
        let local = builder.build_range(reader, offset, size).await?;
        let local_root = local
            .root_digest()
            .expect("local engine returned an empty tree")
            .to_vec();
        info!(rank, root = %hex::encode(&local_root), "local tree complete");

        let gathered = self.transport.gather(local_root).await?;
        self.transport.barrier().await?;

        match gathered {
            Some(digests) => {
                let tree = fold_digests(self.config.algorithm, &digests, world)?;
                Ok(Some(tree))
            }
            None => Ok(None),
        }
    }
}

/// Fold gathered per-rank root digests into the global tree on rank 0.
///
/// Mirrors the rank partition's balanced shape over the digest indices:
/// singletons become leaves carrying the gathered bytes verbatim, parents
/// hash `0x01`-prefixed pairs, and the top carries the `0x02` root prefix.
/// With a single rank the gathered digest (already root-prefixed by the
/// local engine) passes through unchanged, so a one-rank distributed run
/// prints the same root as a single-process run.
pub fn fold_digests(
    algorithm: HashAlgorithm,
    digests: &[u8],
    world: usize,
) -> Result<MerkleTree, ClusterError> {
    let digest_size = algorithm.digest_size();
    let want = digest_size * world;
    if digests.len() != want {
        return Err(ClusterError::GatherSize {
            got: digests.len(),
            want,
        });
    }

    let leaf = |index: usize| {
        let span = &digests[index * digest_size..(index + 1) * digest_size];
        Node::with_digest(NodeKind::Leaf, span.to_vec())
    };

    let root = if world == 1 {
        Node::with_digest(NodeKind::Root, digests.to_vec())
    } else {
        let mid = world / 2;
        let left = fold_span(algorithm, &leaf, 0, mid);
        let right = fold_span(algorithm, &leaf, mid, world);
        let mut node = Node::join(NodeKind::Root, left, right);
        node.hash_from_children(algorithm);
        node
    };

    Ok(MerkleTree {
        algorithm,
        root: Some(root),
    })
}

fn fold_span(
    algorithm: HashAlgorithm,
    leaf: &impl Fn(usize) -> Node,
    lo: usize,
    hi: usize,
) -> Node {
    if hi - lo == 1 {
        return leaf(lo);
    }
    let mid = lo + (hi - lo) / 2;
    let left = fold_span(algorithm, leaf, lo, mid);
    let right = fold_span(algorithm, leaf, mid, hi);
    let mut node = Node::join(NodeKind::Internal, left, right);
    node.hash_from_children(algorithm);
    node
}
