//! Merkle tree data model
//!
//! A pure owned binary tree: each node exclusively owns its children and
//! carries the digest of its byte range. Hashing routines take the algorithm
//! explicitly, so nodes need no back-reference to the tree.

use crate::algorithm::{Digest, HashAlgorithm};

/// Node role, doubling as the domain-separation byte of its hashed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf,
    Internal,
    Root,
}

impl NodeKind {
    /// Byte prefixed to the hashed payload (RFC 6962 style).
    pub fn domain_byte(self) -> u8 {
        match self {
            NodeKind::Leaf => 0x00,
            NodeKind::Internal => 0x01,
            NodeKind::Root => 0x02,
        }
    }
}

/// A node of the Merkle tree.
///
/// Leaves have no children; internal and root nodes own exactly two. The
/// digest starts empty and is populated exactly once, by the task that
/// computes it.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub digest: Digest,
    pub left: Option<Box<Node>>,
    pub right: Option<Box<Node>>,
}

impl Node {
    /// A childless node with an empty digest.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            digest: Digest::new(),
            left: None,
            right: None,
        }
    }

    /// A childless node carrying `digest` verbatim, without hashing.
    ///
    /// Used by the distributed fold, where gathered per-rank roots become
    /// the leaves of the global tree as-is.
    pub fn with_digest(kind: NodeKind, digest: Digest) -> Self {
        Self {
            kind,
            digest,
            left: None,
            right: None,
        }
    }

    /// Join two finished subtrees under a new parent with an empty digest.
    pub fn join(kind: NodeKind, left: Node, right: Node) -> Self {
        Self {
            kind,
            digest: Digest::new(),
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// Compute and store `H(domain_byte || data)`.
    pub fn hash_from_data(&mut self, algorithm: HashAlgorithm, data: &[u8]) {
        self.digest = algorithm.digest(self.kind.domain_byte(), &[data]);
    }

    /// Compute and store `H(domain_byte || left.digest || right.digest)`.
    ///
    /// Both children must exist and have populated digests.
    pub fn hash_from_children(&mut self, algorithm: HashAlgorithm) {
        let left = self.left.as_ref().expect("node missing left child");
        let right = self.right.as_ref().expect("node missing right child");
        debug_assert!(!left.digest.is_empty() && !right.digest.is_empty());
        self.digest = algorithm.digest(self.kind.domain_byte(), &[&left.digest, &right.digest]);
    }

    /// Lowercase fixed-width hex of the digest, two chars per byte.
    pub fn hex(&self) -> String {
        hex::encode(&self.digest)
    }
}

/// The owned tree: algorithm descriptor plus optional root.
///
/// Constructed empty, populated by the builder, immutable thereafter.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    pub algorithm: HashAlgorithm,
    pub root: Option<Node>,
}

impl MerkleTree {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            root: None,
        }
    }

    pub fn digest_size(&self) -> usize {
        self.algorithm.digest_size()
    }

    pub fn root_digest(&self) -> Option<&[u8]> {
        self.root.as_ref().map(|node| node.digest.as_slice())
    }

    pub fn root_hex(&self) -> Option<String> {
        self.root.as_ref().map(Node::hex)
    }
}
