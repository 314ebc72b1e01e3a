use std::io;

use strata_catalog::CatalogError;
use strata_tree::TreeError;
use strata_types::{ChecksumValue, DigestAlgorithm, LogicalPath, ResourceName};
use thiserror::Error;

/// Result alias for ingest operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors produced by the ingestion engine.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("object already exists: {0}")]
    ObjectAlreadyExists(LogicalPath),

    #[error("object not found: {0}")]
    ObjectNotFound(LogicalPath),

    #[error("checksum mismatch for {path}: source {computed}, stored {stored}")]
    ChecksumMismatch {
        path: LogicalPath,
        computed: ChecksumValue,
        stored: ChecksumValue,
    },

    #[error("checksum algorithms differ (recorded {recorded}, claimed {claimed}); comparison is inconclusive")]
    ChecksumAlgorithmMismatch {
        recorded: DigestAlgorithm,
        claimed: DigestAlgorithm,
    },

    #[error("leaf write failed at {leaf}: {source}")]
    LeafWriteFailed {
        leaf: ResourceName,
        #[source]
        source: io::Error,
    },

    #[error("source read failed for {path}: {source}")]
    SourceReadFailed {
        path: LogicalPath,
        #[source]
        source: io::Error,
    },

    #[error("ingest cancelled for {0}")]
    Cancelled(LogicalPath),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
