use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid digest length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("malformed checksum string: {0}")]
    MalformedChecksum(String),

    #[error("invalid logical path: {0}")]
    InvalidPath(String),

    #[error("invalid resource name: {0}")]
    InvalidResourceName(String),
}
