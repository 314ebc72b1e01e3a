//! Foundation types for strata.
//!
//! This crate provides the value types shared by every other strata crate:
//! the names and locations that identify data, and the checksum vocabulary
//! that tracks whether each physical copy is trustworthy.
//!
//! # Key Types
//!
//! - [`LogicalPath`] — collection path + object name identifying a data object
//! - [`ResourceName`] — validated identifier of a node in the resource tree
//! - [`StorageLocation`] — host + vault path owned by a leaf resource
//! - [`ChecksumValue`] — immutable digest tagged with its algorithm
//! - [`ChecksumState`] — Absent / Verified / Stale per-replica trust state
//! - [`ReplicaNumber`] — position of a replica within an object's replica set

pub mod checksum;
pub mod error;
pub mod path;
pub mod resource;

pub use checksum::{ChecksumComparison, ChecksumState, ChecksumValue, DigestAlgorithm};
pub use error::TypeError;
pub use path::LogicalPath;
pub use resource::{ReplicaNumber, ResourceName, StorageLocation};
