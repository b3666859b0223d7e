//! Parallel Merkle tree construction engine
//!
//! Walks the partition recursion as a task graph: sibling subtrees are
//! spawned with no ordering between them and joined before the parent digest
//! is computed. Leaf tasks pass the admission semaphore, take a pool buffer,
//! and run the read+hash on the blocking thread pool, so at most `workers`
//! leaves are in flight no matter how wide the tree fans out.

use std::path::Path;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Semaphore;
use tracing::{debug, trace};

use crate::algorithm::HashAlgorithm;
use crate::partition::{self, BALANCE_THRESHOLD, BLOCK_SIZE};
use crate::pool::BufferPool;
use crate::reader::{ChunkReader, ReadAt, ReadError};
use crate::tree::{MerkleTree, Node, NodeKind};

/// Default concurrency degree: task width and buffer-pool population.
pub const DEFAULT_WORKERS: usize = 8;

/// Engine failure. The first error aborts the run; no partial tree is
/// published.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error("worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Engine configuration.
///
/// `block_size` and `balance_threshold` default to the production constants;
/// tests scale them down to exercise multi-block trees on small files. The
/// triple `(file bytes, algorithm, partition parameters)` fully determines
/// the root digest.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub algorithm: HashAlgorithm,
    pub workers: usize,
    pub block_size: u64,
    pub balance_threshold: u64,
}

impl BuilderConfig {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            workers: DEFAULT_WORKERS,
            block_size: BLOCK_SIZE,
            balance_threshold: BALANCE_THRESHOLD,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_block_size(mut self, block_size: u64) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_balance_threshold(mut self, balance_threshold: u64) -> Self {
        self.balance_threshold = balance_threshold;
        self
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

/// Shared state of one engine run.
struct Scope {
    algorithm: HashAlgorithm,
    reader: Arc<dyn ReadAt>,
    pool: BufferPool,
    gate: Arc<Semaphore>,
    block_size: u64,
    balance_threshold: u64,
}

/// Builds populated [`MerkleTree`]s from files or byte ranges.
pub struct TreeBuilder {
    config: BuilderConfig,
}

impl TreeBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        assert!(config.workers >= 1, "worker count must be at least 1");
        assert!(config.block_size >= 1, "block size must be at least 1");
        Self { config }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Hash an entire file.
    pub async fn build<P: AsRef<Path>>(&self, path: P) -> Result<MerkleTree, BuildError> {
        let reader = ChunkReader::open(path)?;
        let size = reader.len()?;
        self.build_range(Arc::new(reader), 0, size).await
    }

    /// Hash the byte range `[offset, offset + size)` of `reader`.
    ///
    /// This is the per-rank entry point of the distributed driver, which
    /// passes the transport's own [`ReadAt`] implementation.
    pub async fn build_range(
        &self,
        reader: Arc<dyn ReadAt>,
        offset: u64,
        size: u64,
    ) -> Result<MerkleTree, BuildError> {
        debug!(
            algorithm = %self.config.algorithm,
            workers = self.config.workers,
            offset,
            size,
            "building merkle tree"
        );

        let scope = Arc::new(Scope {
            algorithm: self.config.algorithm,
            reader,
            pool: BufferPool::new(self.config.workers, self.config.block_size as usize),
            gate: Arc::new(Semaphore::new(self.config.workers)),
            block_size: self.config.block_size,
            balance_threshold: self.config.balance_threshold,
        });

        // The top node carries the root domain byte. When the whole range
        // fits in one block, the sole leaf is the root and is hashed with
        // the root prefix directly.
        let root = if size <= scope.block_size {
            hash_leaf(scope, offset, size, NodeKind::Root).await?
        } else {
            let ((lo, ls), (ro, rs)) =
                partition::split(offset, size, scope.block_size, scope.balance_threshold);
            let left = tokio::spawn(build_subtree(Arc::clone(&scope), lo, ls));
            let right = tokio::spawn(build_subtree(Arc::clone(&scope), ro, rs));
            let (left, right) = (left.await??, right.await??);
            let mut node = Node::join(NodeKind::Root, left, right);
            node.hash_from_children(scope.algorithm);
            node
        };

        debug!(root = %root.hex(), "merkle tree complete");
        Ok(MerkleTree {
            algorithm: self.config.algorithm,
            root: Some(root),
        })
    }
}

/// Recursive subtree task: leaves hash a block, internal nodes spawn both
/// children, join, then fold their digests.
fn build_subtree(
    scope: Arc<Scope>,
    offset: u64,
    size: u64,
) -> BoxFuture<'static, Result<Node, BuildError>> {
    Box::pin(async move {
        if size <= scope.block_size {
            return hash_leaf(scope, offset, size, NodeKind::Leaf).await;
        }

        let ((lo, ls), (ro, rs)) =
            partition::split(offset, size, scope.block_size, scope.balance_threshold);
        let left = tokio::spawn(build_subtree(Arc::clone(&scope), lo, ls));
        let right = tokio::spawn(build_subtree(Arc::clone(&scope), ro, rs));
        let (left, right) = (left.await??, right.await??);

        let mut node = Node::join(NodeKind::Internal, left, right);
        node.hash_from_children(scope.algorithm);
        Ok(node)
    })
}

/// Leaf task: admission gate, pool buffer, positional read, hash.
///
/// The gate is held across read and hash; leaf tasks beyond the worker count
/// park here instead of piling buffers up.
async fn hash_leaf(
    scope: Arc<Scope>,
    offset: u64,
    size: u64,
    kind: NodeKind,
) -> Result<Node, BuildError> {
    let gate = Arc::clone(&scope.gate);
    let slot = gate
        .acquire_owned()
        .await
        .expect("engine admission gate closed");
    let mut lease = scope.pool.acquire().await;

    trace!(offset, size, "hashing leaf");

    let reader = Arc::clone(&scope.reader);
    let algorithm = scope.algorithm;
    let node = tokio::task::spawn_blocking(move || -> Result<Node, BuildError> {
        let data = &mut lease[..size as usize];
        reader.read_exact_at(offset, data)?;
        let mut node = Node::new(kind);
        node.hash_from_data(algorithm, data);
        // Buffer and admission slot free together, after the hash.
        drop(lease);
        drop(slot);
        Ok(node)
    })
    .await??;

    Ok(node)
}
