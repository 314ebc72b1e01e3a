use strata_catalog::TransactionId;
use strata_types::{
    ChecksumState, DigestAlgorithm, LogicalPath, ReplicaNumber, ResourceName,
};

use crate::cancel::CancelToken;

/// Whether an ingest may create or must replace the object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestMode {
    /// The object must not exist yet.
    Create,
    /// The object must already exist; its replica set is replaced.
    Overwrite,
}

/// Client intent about checksums, carried with every ingest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChecksumDirective {
    /// Write bytes only. A fresh replica gets `Absent` checksum state; an
    /// overwrite that replaces a previously verified object gets `Stale`,
    /// so the superseded digest is never reported as current.
    None,
    /// Digest the source stream while writing and record it as
    /// `Verified`, without re-reading storage.
    RegisterOnly,
    /// Digest the source stream, then independently re-read the stored
    /// bytes and compare. A mismatch fails the ingest with
    /// `ChecksumMismatch` and commits the replica as `Stale` — bytes are
    /// retained for the caller to inspect or retry.
    VerifyOnWrite,
}

/// One ingest operation: which object, where, and with what intent.
#[derive(Clone, Debug)]
pub struct IngestRequest {
    /// Logical path of the object.
    pub path: LogicalPath,
    /// Resource node the write is aimed at (leaf or interior).
    pub target: ResourceName,
    /// Create vs. overwrite.
    pub mode: IngestMode,
    /// Checksum intent.
    pub directive: ChecksumDirective,
    /// Digest algorithm used when the directive records a checksum.
    pub algorithm: DigestAlgorithm,
    /// Optional cooperative cancellation.
    pub cancel: Option<CancelToken>,
}

impl IngestRequest {
    /// A create request with no checksum directive.
    pub fn create(path: LogicalPath, target: ResourceName) -> Self {
        Self {
            path,
            target,
            mode: IngestMode::Create,
            directive: ChecksumDirective::None,
            algorithm: DigestAlgorithm::Blake3,
            cancel: None,
        }
    }

    /// An overwrite request with no checksum directive.
    pub fn overwrite(path: LogicalPath, target: ResourceName) -> Self {
        Self {
            mode: IngestMode::Overwrite,
            ..Self::create(path, target)
        }
    }

    /// Set the checksum directive.
    pub fn with_directive(mut self, directive: ChecksumDirective) -> Self {
        self.directive = directive;
        self
    }

    /// Set the digest algorithm.
    pub fn with_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Per-replica outcome reported in an [`IngestReceipt`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicaSummary {
    /// The replica's number within the object.
    pub replica_number: ReplicaNumber,
    /// The leaf resource that received the bytes.
    pub leaf: ResourceName,
    /// The checksum state recorded at commit.
    pub checksum: ChecksumState,
}

/// The result of a successful ingest.
#[derive(Clone, Debug)]
pub struct IngestReceipt {
    /// The catalog transaction that committed this write.
    pub transaction: TransactionId,
    /// The object written.
    pub path: LogicalPath,
    /// Payload size streamed to each replica.
    pub bytes_written: u64,
    /// One entry per replica, in replica-number order.
    pub replicas: Vec<ReplicaSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> IngestRequest {
        IngestRequest::create(
            LogicalPath::parse("/zone/obj").unwrap(),
            ResourceName::new("demo").unwrap(),
        )
    }

    #[test]
    fn create_defaults() {
        let r = request();
        assert_eq!(r.mode, IngestMode::Create);
        assert_eq!(r.directive, ChecksumDirective::None);
        assert_eq!(r.algorithm, DigestAlgorithm::Blake3);
        assert!(r.cancel.is_none());
    }

    #[test]
    fn builders_set_fields() {
        let token = CancelToken::new();
        let r = request()
            .with_directive(ChecksumDirective::VerifyOnWrite)
            .with_algorithm(DigestAlgorithm::Sha256)
            .with_cancel(token.clone());
        assert_eq!(r.directive, ChecksumDirective::VerifyOnWrite);
        assert_eq!(r.algorithm, DigestAlgorithm::Sha256);
        assert!(r.cancel.is_some());
    }

    #[test]
    fn overwrite_flips_mode_only() {
        let r = IngestRequest::overwrite(
            LogicalPath::parse("/zone/obj").unwrap(),
            ResourceName::new("demo").unwrap(),
        );
        assert_eq!(r.mode, IngestMode::Overwrite);
        assert_eq!(r.directive, ChecksumDirective::None);
    }
}
