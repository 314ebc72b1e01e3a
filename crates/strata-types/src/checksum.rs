use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The digest algorithm a [`ChecksumValue`] was computed with.
///
/// Values computed with different algorithms are never comparable: asking
/// whether a BLAKE3 digest equals a SHA-256 digest is not "no", it is
/// "unanswerable", and [`ChecksumValue::compare`] reports it as such.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// BLAKE3, the default algorithm.
    Blake3,
    /// SHA-256, for interoperating with external tooling.
    Sha256,
}

impl DigestAlgorithm {
    /// The canonical lowercase tag used in rendered checksums.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Blake3 => "blake3",
            Self::Sha256 => "sha256",
        }
    }

    /// Parse a canonical tag back into an algorithm.
    pub fn from_tag(tag: &str) -> Result<Self, TypeError> {
        match tag {
            "blake3" => Ok(Self::Blake3),
            "sha256" => Ok(Self::Sha256),
            other => Err(TypeError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Outcome of comparing two checksum values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChecksumComparison {
    /// Same algorithm, same digest.
    Match,
    /// Same algorithm, different digest.
    Mismatch,
    /// Different algorithms; the comparison is unanswerable.
    Inconclusive,
}

/// An immutable digest of a byte stream, tagged with its algorithm.
///
/// Rendered as `"<algorithm>:<hex>"`, e.g.
/// `blake3:af1349b9f5f9a1a6...`. Identical content hashed with the same
/// algorithm always produces the same value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChecksumValue {
    algorithm: DigestAlgorithm,
    digest: [u8; 32],
}

impl ChecksumValue {
    /// Build a checksum from an algorithm tag and a raw 32-byte digest.
    pub fn new(algorithm: DigestAlgorithm, digest: [u8; 32]) -> Self {
        Self { algorithm, digest }
    }

    /// The algorithm this digest was computed with.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// The raw 32-byte digest.
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Hex-encoded digest without the algorithm tag.
    pub fn to_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Canonical `"<algorithm>:<hex>"` rendering.
    pub fn to_tagged_string(&self) -> String {
        format!("{}:{}", self.algorithm.tag(), self.to_hex())
    }

    /// Parse the canonical `"<algorithm>:<hex>"` rendering.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let (tag, hex_digest) = s
            .split_once(':')
            .ok_or_else(|| TypeError::MalformedChecksum(s.to_string()))?;
        let algorithm = DigestAlgorithm::from_tag(tag)?;
        let bytes = hex::decode(hex_digest).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&bytes);
        Ok(Self { algorithm, digest })
    }

    /// Three-way comparison against another checksum.
    ///
    /// Returns [`ChecksumComparison::Inconclusive`] when the algorithms
    /// differ; callers must treat that outcome as "unknown/stale", never as
    /// equality or inequality.
    pub fn compare(&self, other: &ChecksumValue) -> ChecksumComparison {
        if self.algorithm != other.algorithm {
            ChecksumComparison::Inconclusive
        } else if self.digest == other.digest {
            ChecksumComparison::Match
        } else {
            ChecksumComparison::Mismatch
        }
    }
}

impl fmt::Debug for ChecksumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ChecksumValue({}:{})",
            self.algorithm.tag(),
            hex::encode(&self.digest[..4])
        )
    }
}

impl fmt::Display for ChecksumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_tagged_string())
    }
}

/// Trust state of a single replica's recorded checksum.
///
/// Only `Verified` carries a digest the catalog may report to clients.
/// `Stale` means bytes were rewritten after a digest was recorded; the old
/// digest no longer describes the replica and must never be surfaced as if
/// it did. Externally, both `Absent` and `Stale` read back as the empty
/// marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecksumState {
    /// No checksum was ever recorded for the current bytes.
    Absent,
    /// The digest describes the replica's current bytes.
    Verified(ChecksumValue),
    /// A digest existed but the bytes have changed, or verification failed.
    Stale,
}

impl ChecksumState {
    /// The digest, if and only if this state is trustworthy.
    pub fn verified(&self) -> Option<&ChecksumValue> {
        match self {
            Self::Verified(value) => Some(value),
            Self::Absent | Self::Stale => None,
        }
    }

    /// Returns `true` if this state is `Verified`.
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }

    /// The externally observable rendering: the tagged digest for a
    /// verified replica, the empty string otherwise.
    pub fn report(&self) -> String {
        match self.verified() {
            Some(value) => value.to_tagged_string(),
            None => String::new(),
        }
    }
}
