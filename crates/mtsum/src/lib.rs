//! mtsum - parallel Merkle-tree digest of large files
//!
//! Builds a binary Merkle tree over the bytes of a single file and reports
//! the root digest. Leaves are bounded-size blocks read with positional I/O;
//! leaf hashing runs under a fixed-size buffer pool so memory stays bounded
//! no matter how many leaf tasks the tree expands into.
//!
//! # Core Concepts
//!
//! - **Blocks**: leaf-sized byte ranges, at most [`BLOCK_SIZE`] bytes each
//! - **Domain separation**: every hashed payload is prefixed with a kind
//!   byte (leaf `0x00`, internal `0x01`, root `0x02`) so leaf and internal
//!   digests live in disjoint universes (RFC 6962)
//! - **Admission control**: leaf tasks pass a semaphore sized to the worker
//!   count before touching a buffer, so in-flight reads never exceed the
//!   pool population
//!
//! # Example
//!
//! ```no_run
//! use mtsum::{BuilderConfig, HashAlgorithm, TreeBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let builder = TreeBuilder::new(BuilderConfig::new(HashAlgorithm::Sha256));
//!     let tree = builder.build("large.bin").await?;
//!     println!("{}", tree.root_hex().unwrap());
//!     Ok(())
//! }
//! ```

pub mod algorithm;
pub mod builder;
pub mod dot;
pub mod partition;
pub mod pool;
pub mod reader;
pub mod tree;

// Re-exports for convenience
pub use algorithm::{Digest, HashAlgorithm, UnsupportedAlgorithm};
pub use builder::{BuildError, BuilderConfig, TreeBuilder, DEFAULT_WORKERS};
pub use partition::{BALANCE_THRESHOLD, BLOCK_SIZE};
pub use pool::{BufferLease, BufferPool};
pub use reader::{ChunkReader, ReadAt, ReadError};
pub use tree::{MerkleTree, Node, NodeKind};
