use strata_types::LogicalPath;
use thiserror::Error;

/// Result alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors produced by catalog operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("object busy: an ingest transaction is already in flight for {0}")]
    ObjectBusy(LogicalPath),

    #[error("object not found: {0}")]
    ObjectNotFound(LogicalPath),

    #[error("invalid replica set for {path}: {reason}")]
    InvalidReplicaSet { path: LogicalPath, reason: String },
}
