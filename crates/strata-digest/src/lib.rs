//! Streaming digest computation for strata.
//!
//! This crate is the digest collaborator of the ingestion engine: it turns
//! byte streams into [`ChecksumValue`]s without ever buffering a whole
//! payload. The same digester is invokable twice per verify-on-write —
//! once over the source stream as it is written, once over the stored
//! bytes read back from the leaf.
//!
//! # Key Types
//!
//! - [`StreamDigester`] — incremental hasher for a chosen algorithm
//! - [`DigestWriter`] — a [`std::io::Write`] adapter that forwards bytes to
//!   an inner writer while hashing them on the fly

pub mod hasher;

pub use hasher::{digest_bytes, digest_reader, DigestWriter, StreamDigester};
