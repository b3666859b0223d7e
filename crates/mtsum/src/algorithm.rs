//! Named digest algorithms and one-shot hashing

use md5::Md5;
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;

/// An owned digest; its length is [`HashAlgorithm::digest_size`] bytes.
pub type Digest = Vec<u8>;

/// Requested algorithm name is not in the supported table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported algorithm: {0}")]
pub struct UnsupportedAlgorithm(pub String);

/// A named cryptographic digest algorithm.
///
/// Wraps the RustCrypto hash implementations behind a single descriptor so
/// the tree code can carry the algorithm by value and hash without caring
/// which primitive is underneath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// All supported algorithms, in table order.
    pub const ALL: [HashAlgorithm; 5] = [
        HashAlgorithm::Md5,
        HashAlgorithm::Sha1,
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha384,
        HashAlgorithm::Sha512,
    ];

    /// Look up an algorithm by its lowercase name.
    pub fn lookup(name: &str) -> Result<Self, UnsupportedAlgorithm> {
        match name {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            other => Err(UnsupportedAlgorithm(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    /// Output width in bytes.
    pub fn digest_size(self) -> usize {
        match self {
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Compute `H(domain || parts[0] || parts[1] || ...)` in one finalized pass.
    ///
    /// The domain byte keeps leaf, internal and root payloads in disjoint
    /// input universes; callers pass the payload as one or more contiguous
    /// spans to avoid concatenating large buffers.
    pub fn digest(self, domain: u8, parts: &[&[u8]]) -> Digest {
        match self {
            HashAlgorithm::Md5 => digest_with::<Md5>(domain, parts),
            HashAlgorithm::Sha1 => digest_with::<Sha1>(domain, parts),
            HashAlgorithm::Sha256 => digest_with::<Sha256>(domain, parts),
            HashAlgorithm::Sha384 => digest_with::<Sha384>(domain, parts),
            HashAlgorithm::Sha512 => digest_with::<Sha512>(domain, parts),
        }
    }
}

fn digest_with<D: sha2::Digest>(domain: u8, parts: &[&[u8]]) -> Digest {
    let mut ctx = D::new();
    ctx.update([domain]);
    for part in parts {
        ctx.update(part);
    }
    ctx.finalize().to_vec()
}

impl FromStr for HashAlgorithm {
    type Err = UnsupportedAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HashAlgorithm::lookup(s)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_names() {
        for algorithm in HashAlgorithm::ALL {
            assert_eq!(HashAlgorithm::lookup(algorithm.name()).unwrap(), algorithm);
        }
    }

    #[test]
    fn test_lookup_unknown_name() {
        let err = HashAlgorithm::lookup("blake3").unwrap_err();
        assert_eq!(err, UnsupportedAlgorithm("blake3".to_string()));
    }

    #[test]
    fn test_digest_sizes() {
        let sizes: Vec<_> = HashAlgorithm::ALL.iter().map(|a| a.digest_size()).collect();
        assert_eq!(sizes, vec![16, 20, 32, 48, 64]);
    }

    #[test]
    fn test_digest_matches_size() {
        for algorithm in HashAlgorithm::ALL {
            let digest = algorithm.digest(0x00, &[b"data"]);
            assert_eq!(digest.len(), algorithm.digest_size());
        }
    }

    #[test]
    fn test_digest_sha256_known_value() {
        // sha256(0x02 || "a")
        let digest = HashAlgorithm::Sha256.digest(0x02, &[b"a"]);
        assert_eq!(
            hex::encode(&digest),
            "bf5d3affb73efd2ec6c36ad3112dd933efed63c4e1cbffcfa88e2759c144f2d8"
        );
    }

    #[test]
    fn test_digest_parts_are_concatenated() {
        let joined = HashAlgorithm::Sha256.digest(0x01, &[b"left", b"right"]);
        let whole = HashAlgorithm::Sha256.digest(0x01, &[b"leftright"]);
        assert_eq!(joined, whole);
    }

    #[test]
    fn test_domain_byte_changes_digest() {
        let leaf = HashAlgorithm::Sha256.digest(0x00, &[b"payload"]);
        let internal = HashAlgorithm::Sha256.digest(0x01, &[b"payload"]);
        assert_ne!(leaf, internal);
    }

    #[test]
    fn test_from_str_roundtrip() {
        let algorithm: HashAlgorithm = "sha384".parse().unwrap();
        assert_eq!(algorithm.to_string(), "sha384");
    }
}
