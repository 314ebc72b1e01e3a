//! Ingestion engine for strata.
//!
//! This crate ties the other strata crates together into the operation
//! clients actually invoke: stream bytes into the resource hierarchy,
//! place one replica per resolved leaf, and record each replica's
//! checksum state in the catalog — atomically, under per-object
//! exclusion, with best-effort cleanup of leaf bytes when anything fails
//! before the commit point.
//!
//! # The state machine
//!
//! `ingest` resolves the target resource to leaf targets, streams the
//! source once (all leaf writers are fed chunk by chunk in the same
//! pass, and the source digest is computed over that same pass), then
//! finalizes:
//!
//! - directive `None` — no digest is recorded; a replica that replaces a
//!   previously verified object is marked `Stale`, a fresh one `Absent`.
//! - `RegisterOnly` — the source-stream digest is recorded as `Verified`
//!   without re-reading storage.
//! - `VerifyOnWrite` — stored bytes are independently re-read and
//!   digested; a mismatch commits the replica as `Stale` and surfaces
//!   [`IngestError::ChecksumMismatch`] (bytes are retained for
//!   remediation — this is the one failure that changes catalog state).
//!
//! The catalog commit is the durability boundary: every other failure
//! (resolution, leaf I/O, cancellation) rolls back written leaves and
//! leaves the catalog untouched.
//!
//! # Key Types
//!
//! - [`IngestEngine`] — the engine; owns the tree, a catalog, a leaf store
//! - [`IngestRequest`] / [`IngestReceipt`] — operation input and result
//! - [`ByteSource`] — streamed input of known or unknown length
//! - [`LeafStore`] — byte sink/source seam, with in-memory and
//!   filesystem-vault implementations
//! - [`CancelToken`] — cooperative cancellation up to the commit point

pub mod cancel;
pub mod engine;
pub mod error;
pub mod request;
pub mod source;
pub mod store;

pub use cancel::CancelToken;
pub use engine::IngestEngine;
pub use error::{IngestError, IngestResult};
pub use request::{ChecksumDirective, IngestMode, IngestReceipt, IngestRequest, ReplicaSummary};
pub use source::ByteSource;
pub use store::{LeafStore, LeafWriter, MemoryLeafStore, VaultStore};
