use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::{debug, info, warn};

use strata_catalog::{Replica, ReplicaCatalog};
use strata_digest::{digest_reader, StreamDigester};
use strata_tree::{LeafTarget, ResourceTree, WriteContext};
use strata_types::{ChecksumComparison, ChecksumState, ChecksumValue, LogicalPath};

use crate::error::{IngestError, IngestResult};
use crate::request::{ChecksumDirective, IngestMode, IngestReceipt, IngestRequest, ReplicaSummary};
use crate::source::ByteSource;
use crate::store::{LeafStore, LeafWriter};

/// Stream chunk size for leaf writes and digest computation.
const CHUNK_SIZE: usize = 64 * 1024;

/// The ingestion engine: resolves writes through the resource tree,
/// streams bytes to leaves, and records replica state in the catalog.
///
/// The engine holds no per-object state of its own; all mutation goes
/// through catalog transactions, so any number of engines sharing a
/// catalog observe the same per-object exclusion.
pub struct IngestEngine<C, S> {
    tree: ResourceTree,
    catalog: C,
    store: S,
    write_serial: AtomicU64,
}

impl<C: ReplicaCatalog, S: LeafStore> IngestEngine<C, S> {
    /// Assemble an engine from a frozen topology, a catalog, and a leaf
    /// store.
    pub fn new(tree: ResourceTree, catalog: C, store: S) -> Self {
        Self {
            tree,
            catalog,
            store,
            write_serial: AtomicU64::new(0),
        }
    }

    /// The resource topology.
    pub fn tree(&self) -> &ResourceTree {
        &self.tree
    }

    /// The replica catalog.
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// The leaf store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ingest one object: resolve, stream, verify per directive, commit.
    ///
    /// On success every resolved leaf holds the full payload and the
    /// catalog shows the new replica set. On failure the catalog is
    /// untouched and written leaf bytes are rolled back best-effort —
    /// except [`IngestError::ChecksumMismatch`], which intentionally
    /// commits the replicas in `Stale` state and retains the bytes.
    pub fn ingest(
        &self,
        request: IngestRequest,
        mut source: ByteSource,
    ) -> IngestResult<IngestReceipt> {
        let txn = self.catalog.begin(&request.path)?;

        match request.mode {
            IngestMode::Create if txn.existing().is_some() => {
                self.catalog.abort(txn);
                return Err(IngestError::ObjectAlreadyExists(request.path));
            }
            IngestMode::Overwrite if txn.existing().is_none() => {
                self.catalog.abort(txn);
                return Err(IngestError::ObjectNotFound(request.path));
            }
            _ => {}
        }

        let serial = self.write_serial.fetch_add(1, Ordering::Relaxed);
        let ctx = WriteContext {
            path: request.path.clone(),
            write_serial: serial,
        };
        let targets = match self.tree.resolve(&request.target, &ctx) {
            Ok(targets) => targets,
            Err(e) => {
                self.catalog.abort(txn);
                return Err(e.into());
            }
        };
        debug!(
            path = %request.path,
            target = %request.target,
            leaves = targets.len(),
            size_hint = ?source.size_hint(),
            "ingest resolved"
        );

        // Open every leaf writer before consuming any input; the source
        // is one-shot and all leaves must see the full stream.
        let mut writers: Vec<Box<dyn LeafWriter>> = Vec::with_capacity(targets.len());
        for target in &targets {
            match self.store.writer(&target.location, &request.path) {
                Ok(writer) => writers.push(writer),
                Err(e) => {
                    self.catalog.abort(txn);
                    return Err(IngestError::LeafWriteFailed {
                        leaf: target.leaf.clone(),
                        source: e,
                    });
                }
            }
        }

        // Single pass: each chunk goes to every leaf and into the source
        // digest. Abandoned writers publish nothing, so exits before the
        // first finish() need no leaf cleanup.
        let mut digester = StreamDigester::new(request.algorithm);
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut total: u64 = 0;
        loop {
            if let Some(token) = &request.cancel {
                if token.is_cancelled() {
                    drop(writers);
                    self.catalog.abort(txn);
                    return Err(IngestError::Cancelled(request.path));
                }
            }
            let n = match source.read(&mut buf) {
                Ok(n) => n,
                Err(e) => {
                    drop(writers);
                    self.catalog.abort(txn);
                    return Err(IngestError::SourceReadFailed {
                        path: request.path,
                        source: e,
                    });
                }
            };
            if n == 0 {
                break;
            }
            total += n as u64;
            let mut write_failure = None;
            for (target, writer) in targets.iter().zip(writers.iter_mut()) {
                if let Err(e) = writer.write_all(&buf[..n]) {
                    write_failure = Some((target.leaf.clone(), e));
                    break;
                }
            }
            if let Some((leaf, e)) = write_failure {
                drop(writers);
                self.catalog.abort(txn);
                return Err(IngestError::LeafWriteFailed { leaf, source: e });
            }
            digester.update(&buf[..n]);
        }

        // Publish leaf by leaf; a failure here rolls back the leaves
        // already published and aborts.
        for (index, writer) in writers.into_iter().enumerate() {
            if let Err(e) = writer.finish() {
                self.rollback_leaves(&targets[..index], &request.path);
                let leaf = targets[index].leaf.clone();
                self.catalog.abort(txn);
                return Err(IngestError::LeafWriteFailed { leaf, source: e });
            }
        }

        if let Some(token) = &request.cancel {
            if token.is_cancelled() {
                self.rollback_leaves(&targets, &request.path);
                self.catalog.abort(txn);
                return Err(IngestError::Cancelled(request.path));
            }
        }

        let source_checksum = digester.finalize();
        let had_verified = txn.existing().is_some_and(previously_verified);
        let (states, mismatch) =
            match self.checksum_states(&request, &targets, source_checksum, had_verified) {
                Ok(result) => result,
                Err((leaf, e)) => {
                    self.rollback_leaves(&targets, &request.path);
                    self.catalog.abort(txn);
                    return Err(IngestError::LeafWriteFailed { leaf, source: e });
                }
            };

        let now = Utc::now();
        let prior = txn.existing().cloned();
        let replicas: Vec<Replica> = targets
            .iter()
            .zip(states.iter())
            .map(|(target, state)| {
                let created_at = prior
                    .as_ref()
                    .and_then(|object| {
                        object
                            .replicas
                            .values()
                            .find(|r| r.leaf == target.leaf)
                            .map(|r| r.created_at)
                    })
                    .unwrap_or(now);
                Replica {
                    replica_number: target.replica_number,
                    leaf: target.leaf.clone(),
                    location: target.location.clone(),
                    checksum: *state,
                    size: total,
                    created_at,
                    modified_at: now,
                }
            })
            .collect();

        let transaction = txn.id();
        let summaries: Vec<ReplicaSummary> = replicas
            .iter()
            .map(|r| ReplicaSummary {
                replica_number: r.replica_number,
                leaf: r.leaf.clone(),
                checksum: r.checksum,
            })
            .collect();

        self.catalog.commit(txn, replicas)?;

        if let Some((computed, stored)) = mismatch {
            warn!(
                path = %request.path,
                %computed,
                %stored,
                "verify-on-write mismatch; replicas committed stale"
            );
            return Err(IngestError::ChecksumMismatch {
                path: request.path,
                computed,
                stored,
            });
        }

        info!(
            path = %request.path,
            txn = %transaction,
            replicas = summaries.len(),
            bytes = total,
            "ingest committed"
        );
        Ok(IngestReceipt {
            transaction,
            path: request.path,
            bytes_written: total,
            replicas: summaries,
        })
    }

    /// Remove an object: delete its replica bytes (best-effort, logged)
    /// and its catalog record.
    pub fn remove(&self, path: &LogicalPath) -> IngestResult<()> {
        let txn = self.catalog.begin(path)?;
        let existing = match txn.existing() {
            Some(object) => object.clone(),
            None => {
                self.catalog.abort(txn);
                return Err(IngestError::ObjectNotFound(path.clone()));
            }
        };
        for replica in existing.replicas.values() {
            if let Err(e) = self.store.remove(&replica.location, path) {
                warn!(
                    path = %path,
                    leaf = %replica.leaf,
                    error = %e,
                    "replica byte removal failed"
                );
            }
        }
        self.catalog.remove(txn)?;
        info!(path = %path, "object removed");
        Ok(())
    }

    /// The object-level checksum, `None` for absent or stale state.
    pub fn checksum(&self, path: &LogicalPath) -> IngestResult<Option<ChecksumValue>> {
        Ok(self.catalog.get_checksum(path)?)
    }

    /// The externally observable checksum string: the tagged digest, or
    /// the empty marker for absent/stale state.
    pub fn checksum_report(&self, path: &LogicalPath) -> IngestResult<String> {
        Ok(self
            .catalog
            .get_checksum(path)?
            .map(|value| value.to_tagged_string())
            .unwrap_or_default())
    }

    /// All live replicas of an object.
    pub fn list_replicas(&self, path: &LogicalPath) -> IngestResult<Vec<Replica>> {
        Ok(self.catalog.list_replicas(path)?)
    }

    /// Compare a caller-supplied checksum against the recorded one.
    ///
    /// `Ok(false)` covers both a differing digest and an object with no
    /// verified checksum. Algorithms that differ make the comparison
    /// unanswerable and fail with
    /// [`IngestError::ChecksumAlgorithmMismatch`].
    pub fn verify_checksum(
        &self,
        path: &LogicalPath,
        claimed: &ChecksumValue,
    ) -> IngestResult<bool> {
        match self.catalog.get_checksum(path)? {
            None => Ok(false),
            Some(recorded) => match recorded.compare(claimed) {
                ChecksumComparison::Match => Ok(true),
                ChecksumComparison::Mismatch => Ok(false),
                ChecksumComparison::Inconclusive => Err(IngestError::ChecksumAlgorithmMismatch {
                    recorded: recorded.algorithm(),
                    claimed: claimed.algorithm(),
                }),
            },
        }
    }

    /// Decide the checksum state for every target, re-reading stored
    /// bytes when the directive demands verification.
    ///
    /// Returns the per-target states plus the first mismatch (computed,
    /// stored) if verification failed anywhere. Read-back I/O errors are
    /// reported with the offending leaf.
    #[allow(clippy::type_complexity)]
    fn checksum_states(
        &self,
        request: &IngestRequest,
        targets: &[LeafTarget],
        source_checksum: ChecksumValue,
        previously_verified: bool,
    ) -> Result<
        (Vec<ChecksumState>, Option<(ChecksumValue, ChecksumValue)>),
        (strata_types::ResourceName, std::io::Error),
    > {
        match request.directive {
            ChecksumDirective::None => {
                let state = if previously_verified {
                    ChecksumState::Stale
                } else {
                    ChecksumState::Absent
                };
                Ok((vec![state; targets.len()], None))
            }
            ChecksumDirective::RegisterOnly => Ok((
                vec![ChecksumState::Verified(source_checksum); targets.len()],
                None,
            )),
            ChecksumDirective::VerifyOnWrite => {
                let mut states = Vec::with_capacity(targets.len());
                let mut mismatch = None;
                for target in targets {
                    let mut reader = self
                        .store
                        .reader(&target.location, &request.path)
                        .map_err(|e| (target.leaf.clone(), e))?;
                    let stored = digest_reader(request.algorithm, &mut reader)
                        .map_err(|e| (target.leaf.clone(), e))?;
                    match source_checksum.compare(&stored) {
                        ChecksumComparison::Match => {
                            states.push(ChecksumState::Verified(source_checksum));
                        }
                        ChecksumComparison::Mismatch | ChecksumComparison::Inconclusive => {
                            if mismatch.is_none() {
                                mismatch = Some((source_checksum, stored));
                            }
                            states.push(ChecksumState::Stale);
                        }
                    }
                }
                Ok((states, mismatch))
            }
        }
    }

    fn rollback_leaves(&self, published: &[LeafTarget], path: &LogicalPath) {
        for target in published {
            if let Err(e) = self.store.remove(&target.location, path) {
                warn!(
                    path = %path,
                    leaf = %target.leaf,
                    error = %e,
                    "rollback removal failed"
                );
            }
        }
    }
}

fn previously_verified(object: &strata_catalog::DataObject) -> bool {
    object.replicas.values().any(|r| r.checksum.is_verified())
}

impl<C, S> std::fmt::Debug for IngestEngine<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestEngine")
            .field("resources", &self.tree.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    use strata_catalog::{CatalogError, InMemoryCatalog};
    use strata_digest::digest_bytes;
    use strata_tree::TreeBuilder;
    use strata_types::{DigestAlgorithm, ResourceName, StorageLocation};

    use crate::cancel::CancelToken;
    use crate::store::MemoryLeafStore;

    fn name(s: &str) -> ResourceName {
        ResourceName::new(s).unwrap()
    }

    fn path(s: &str) -> LogicalPath {
        LogicalPath::parse(s).unwrap()
    }

    fn location(leaf: &str) -> StorageLocation {
        StorageLocation::new(leaf, format!("/vault/{leaf}"))
    }

    /// Bytes with the "arbitrary" fill pattern used across scenarios.
    fn arbitrary_bytes(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i.wrapping_mul(31) + 7) as u8).collect()
    }

    fn single_leaf_engine() -> IngestEngine<InMemoryCatalog, MemoryLeafStore> {
        let mut builder = TreeBuilder::new();
        builder.add_leaf(name("demo_resc"), location("demo_resc")).unwrap();
        IngestEngine::new(
            builder.build().unwrap(),
            InMemoryCatalog::new(),
            MemoryLeafStore::new(),
        )
    }

    fn replication_engine(leaves: &[&str]) -> IngestEngine<InMemoryCatalog, MemoryLeafStore> {
        let mut builder = TreeBuilder::new();
        builder.add_replication(name("repl")).unwrap();
        for leaf in leaves {
            builder.add_leaf(name(leaf), location(leaf)).unwrap();
            builder.add_child(&name("repl"), &name(leaf)).unwrap();
        }
        IngestEngine::new(
            builder.build().unwrap(),
            InMemoryCatalog::new(),
            MemoryLeafStore::new(),
        )
    }

    /// Passthrough over Replication(Random(a,b), Random(c,d)).
    fn brood_engine() -> IngestEngine<InMemoryCatalog, MemoryLeafStore> {
        let mut builder = TreeBuilder::new();
        builder.add_passthrough(name("root_pt")).unwrap();
        builder.add_replication(name("repl")).unwrap();
        builder.add_random(name("rand_1")).unwrap();
        builder.add_random(name("rand_2")).unwrap();
        for leaf in ["leaf_a", "leaf_b", "leaf_c", "leaf_d"] {
            builder.add_leaf(name(leaf), location(leaf)).unwrap();
        }
        builder.add_child(&name("root_pt"), &name("repl")).unwrap();
        builder.add_child(&name("repl"), &name("rand_1")).unwrap();
        builder.add_child(&name("repl"), &name("rand_2")).unwrap();
        builder.add_child(&name("rand_1"), &name("leaf_a")).unwrap();
        builder.add_child(&name("rand_1"), &name("leaf_b")).unwrap();
        builder.add_child(&name("rand_2"), &name("leaf_c")).unwrap();
        builder.add_child(&name("rand_2"), &name("leaf_d")).unwrap();
        IngestEngine::new(
            builder.build().unwrap(),
            InMemoryCatalog::new(),
            MemoryLeafStore::new(),
        )
    }

    // -----------------------------------------------------------------------
    // Fault-injection stores
    // -----------------------------------------------------------------------

    /// Delegates to a memory store but flips every byte on the way down,
    /// so stored bytes never match the source stream.
    struct CorruptingStore {
        inner: MemoryLeafStore,
    }

    struct CorruptingWriter {
        inner: Box<dyn LeafWriter>,
    }

    impl Write for CorruptingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let twisted: Vec<u8> = buf.iter().map(|b| b ^ 0xff).collect();
            self.inner.write(&twisted)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    impl LeafWriter for CorruptingWriter {
        fn finish(self: Box<Self>) -> io::Result<u64> {
            self.inner.finish()
        }
    }

    impl LeafStore for CorruptingStore {
        fn writer(
            &self,
            location: &StorageLocation,
            path: &LogicalPath,
        ) -> io::Result<Box<dyn LeafWriter>> {
            Ok(Box::new(CorruptingWriter {
                inner: self.inner.writer(location, path)?,
            }))
        }

        fn reader(
            &self,
            location: &StorageLocation,
            path: &LogicalPath,
        ) -> io::Result<Box<dyn Read + Send>> {
            self.inner.reader(location, path)
        }

        fn remove(&self, location: &StorageLocation, path: &LogicalPath) -> io::Result<bool> {
            self.inner.remove(location, path)
        }

        fn exists(&self, location: &StorageLocation, path: &LogicalPath) -> io::Result<bool> {
            self.inner.exists(location, path)
        }
    }

    /// Accepts writers for every leaf but fails mid-stream on one host.
    struct FailingStore {
        inner: MemoryLeafStore,
        fail_host: String,
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "storage unavailable"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LeafWriter for FailingWriter {
        fn finish(self: Box<Self>) -> io::Result<u64> {
            Err(io::Error::new(io::ErrorKind::Other, "storage unavailable"))
        }
    }

    impl LeafStore for FailingStore {
        fn writer(
            &self,
            location: &StorageLocation,
            path: &LogicalPath,
        ) -> io::Result<Box<dyn LeafWriter>> {
            if location.host == self.fail_host {
                Ok(Box::new(FailingWriter))
            } else {
                self.inner.writer(location, path)
            }
        }

        fn reader(
            &self,
            location: &StorageLocation,
            path: &LogicalPath,
        ) -> io::Result<Box<dyn Read + Send>> {
            self.inner.reader(location, path)
        }

        fn remove(&self, location: &StorageLocation, path: &LogicalPath) -> io::Result<bool> {
            self.inner.remove(location, path)
        }

        fn exists(&self, location: &StorageLocation, path: &LogicalPath) -> io::Result<bool> {
            self.inner.exists(location, path)
        }
    }

    // -----------------------------------------------------------------------
    // Checksum state machine
    // -----------------------------------------------------------------------

    #[test]
    fn empty_stream_create_with_register() {
        let engine = single_leaf_engine();
        let p = path("/zone/home/test_zero_length_put");
        let receipt = engine
            .ingest(
                IngestRequest::create(p.clone(), name("demo_resc"))
                    .with_directive(ChecksumDirective::RegisterOnly),
                ByteSource::empty(),
            )
            .unwrap();

        assert_eq!(receipt.bytes_written, 0);
        assert_eq!(receipt.replicas.len(), 1);
        assert_eq!(
            engine.checksum(&p).unwrap(),
            Some(digest_bytes(DigestAlgorithm::Blake3, b""))
        );
    }

    #[test]
    fn register_matches_independent_digest() {
        let engine = single_leaf_engine();
        let data = arbitrary_bytes(512);
        let p = path("/zone/home/test_small_put");
        engine
            .ingest(
                IngestRequest::create(p.clone(), name("demo_resc"))
                    .with_directive(ChecksumDirective::RegisterOnly),
                ByteSource::from_bytes(data.clone()),
            )
            .unwrap();

        let expected = digest_bytes(DigestAlgorithm::Blake3, &data);
        assert_eq!(engine.checksum(&p).unwrap(), Some(expected));
        assert_eq!(engine.checksum_report(&p).unwrap(), expected.to_tagged_string());
    }

    #[test]
    fn fresh_create_without_directive_is_absent() {
        let engine = single_leaf_engine();
        let p = path("/zone/home/obj");
        engine
            .ingest(
                IngestRequest::create(p.clone(), name("demo_resc")),
                ByteSource::from_bytes(&b"plain bytes"[..]),
            )
            .unwrap();

        assert_eq!(engine.checksum_report(&p).unwrap(), "");
        let replicas = engine.list_replicas(&p).unwrap();
        assert_eq!(replicas[0].checksum, ChecksumState::Absent);
    }

    #[test]
    fn blind_overwrite_stales_a_verified_checksum() {
        let engine = single_leaf_engine();
        let p = path("/zone/home/obj");
        engine
            .ingest(
                IngestRequest::create(p.clone(), name("demo_resc"))
                    .with_directive(ChecksumDirective::RegisterOnly),
                ByteSource::from_bytes(arbitrary_bytes(512)),
            )
            .unwrap();
        assert!(engine.checksum(&p).unwrap().is_some());

        engine
            .ingest(
                IngestRequest::overwrite(p.clone(), name("demo_resc")),
                ByteSource::from_bytes(arbitrary_bytes(4444)),
            )
            .unwrap();

        // The old digest must never resurface.
        assert_eq!(engine.checksum(&p).unwrap(), None);
        assert_eq!(engine.checksum_report(&p).unwrap(), "");
        let replicas = engine.list_replicas(&p).unwrap();
        assert_eq!(replicas[0].checksum, ChecksumState::Stale);
    }

    #[test]
    fn overwrite_matrix_roundtrip() {
        // Create with verify, blind overwrite, then register the original
        // content again: the final checksum equals the original digest.
        let engine = single_leaf_engine();
        let original = arbitrary_bytes(512);
        let expected = digest_bytes(DigestAlgorithm::Blake3, &original);
        let p = path("/zone/home/test_small_put");

        engine
            .ingest(
                IngestRequest::create(p.clone(), name("demo_resc"))
                    .with_directive(ChecksumDirective::VerifyOnWrite),
                ByteSource::from_bytes(original.clone()),
            )
            .unwrap();
        assert_eq!(engine.checksum(&p).unwrap(), Some(expected));

        engine
            .ingest(
                IngestRequest::overwrite(p.clone(), name("demo_resc")),
                ByteSource::from_bytes(arbitrary_bytes(4444)),
            )
            .unwrap();
        assert_eq!(engine.checksum_report(&p).unwrap(), "");

        engine
            .ingest(
                IngestRequest::overwrite(p.clone(), name("demo_resc"))
                    .with_directive(ChecksumDirective::RegisterOnly),
                ByteSource::from_bytes(original),
            )
            .unwrap();
        assert_eq!(engine.checksum(&p).unwrap(), Some(expected));
    }

    #[test]
    fn verify_on_write_records_checksum() {
        let engine = single_leaf_engine();
        let data = arbitrary_bytes(1024);
        let p = path("/zone/home/obj");
        let receipt = engine
            .ingest(
                IngestRequest::create(p.clone(), name("demo_resc"))
                    .with_directive(ChecksumDirective::VerifyOnWrite),
                ByteSource::from_bytes(data.clone()),
            )
            .unwrap();

        assert!(receipt.replicas[0].checksum.is_verified());
        assert_eq!(
            engine.checksum(&p).unwrap(),
            Some(digest_bytes(DigestAlgorithm::Blake3, &data))
        );
    }

    #[test]
    fn verify_rejects_corrupted_storage() {
        let mut builder = TreeBuilder::new();
        builder.add_leaf(name("demo_resc"), location("demo_resc")).unwrap();
        let inner = MemoryLeafStore::new();
        let engine = IngestEngine::new(
            builder.build().unwrap(),
            InMemoryCatalog::new(),
            CorruptingStore { inner: inner.clone() },
        );

        let p = path("/zone/home/obj");
        let err = engine
            .ingest(
                IngestRequest::create(p.clone(), name("demo_resc"))
                    .with_directive(ChecksumDirective::VerifyOnWrite),
                ByteSource::from_bytes(arbitrary_bytes(512)),
            )
            .unwrap_err();
        assert!(matches!(err, IngestError::ChecksumMismatch { .. }));

        // The replica is committed stale with bytes retained for
        // remediation; no verified checksum is ever reported.
        assert_eq!(engine.checksum(&p).unwrap(), None);
        let replicas = engine.list_replicas(&p).unwrap();
        assert_eq!(replicas[0].checksum, ChecksumState::Stale);
        assert!(inner.contents(&location("demo_resc"), &p).is_some());
    }

    #[test]
    fn sha256_directive_uses_that_algorithm() {
        let engine = single_leaf_engine();
        let data = arbitrary_bytes(64);
        let p = path("/zone/home/obj");
        engine
            .ingest(
                IngestRequest::create(p.clone(), name("demo_resc"))
                    .with_directive(ChecksumDirective::RegisterOnly)
                    .with_algorithm(DigestAlgorithm::Sha256),
                ByteSource::from_bytes(data.clone()),
            )
            .unwrap();
        assert_eq!(
            engine.checksum(&p).unwrap(),
            Some(digest_bytes(DigestAlgorithm::Sha256, &data))
        );
    }

    // -----------------------------------------------------------------------
    // Modes
    // -----------------------------------------------------------------------

    #[test]
    fn create_fails_on_existing_object() {
        let engine = single_leaf_engine();
        let p = path("/zone/home/obj");
        engine
            .ingest(
                IngestRequest::create(p.clone(), name("demo_resc")),
                ByteSource::from_bytes(&b"first"[..]),
            )
            .unwrap();

        let err = engine
            .ingest(
                IngestRequest::create(p.clone(), name("demo_resc")),
                ByteSource::from_bytes(&b"second"[..]),
            )
            .unwrap_err();
        assert!(matches!(err, IngestError::ObjectAlreadyExists(_)));
        // Slot released: a later overwrite succeeds.
        engine
            .ingest(
                IngestRequest::overwrite(p, name("demo_resc")),
                ByteSource::from_bytes(&b"third"[..]),
            )
            .unwrap();
    }

    #[test]
    fn overwrite_requires_existing_object() {
        let engine = single_leaf_engine();
        let err = engine
            .ingest(
                IngestRequest::overwrite(path("/zone/home/ghost"), name("demo_resc")),
                ByteSource::from_bytes(&b"bytes"[..]),
            )
            .unwrap_err();
        assert!(matches!(err, IngestError::ObjectNotFound(_)));
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    #[test]
    fn replication_fans_out_to_every_leaf() {
        let engine = replication_engine(&["ufs0", "ufs1", "ufs2"]);
        let data = arbitrary_bytes(100);
        let p = path("/zone/home/obj");
        let receipt = engine
            .ingest(
                IngestRequest::create(p.clone(), name("repl"))
                    .with_directive(ChecksumDirective::RegisterOnly),
                ByteSource::from_bytes(data.clone()),
            )
            .unwrap();

        let numbers: Vec<u32> = receipt.replicas.iter().map(|r| r.replica_number).collect();
        assert_eq!(numbers, vec![0, 1, 2]);
        for leaf in ["ufs0", "ufs1", "ufs2"] {
            assert_eq!(
                engine.store().contents(&location(leaf), &p).unwrap().as_ref(),
                data.as_slice()
            );
        }
        assert!(receipt.replicas.iter().all(|r| r.checksum.is_verified()));
    }

    #[test]
    fn random_selection_writes_exactly_one_leaf() {
        let mut builder = TreeBuilder::new();
        builder.add_random(name("rand")).unwrap();
        for leaf in ["ufs0", "ufs1"] {
            builder.add_leaf(name(leaf), location(leaf)).unwrap();
            builder.add_child(&name("rand"), &name(leaf)).unwrap();
        }
        let engine = IngestEngine::new(
            builder.build().unwrap(),
            InMemoryCatalog::new(),
            MemoryLeafStore::new(),
        );

        let p = path("/zone/home/obj");
        let receipt = engine
            .ingest(
                IngestRequest::create(p.clone(), name("rand")),
                ByteSource::from_bytes(&b"routed once"[..]),
            )
            .unwrap();
        assert_eq!(receipt.replicas.len(), 1);
        assert_eq!(engine.store().len(), 1);
    }

    #[test]
    fn brood_placement_over_thirty_objects() {
        let engine = brood_engine();
        let mut leaf_usage = std::collections::HashMap::new();

        for i in 0..30 {
            let p = path(&format!("/zone/home/brood/obj_{i}"));
            let receipt = engine
                .ingest(
                    IngestRequest::create(p, name("root_pt")),
                    ByteSource::from_bytes(arbitrary_bytes(10)),
                )
                .unwrap();

            // Exactly replicas 0 and 1, one per random pool.
            let numbers: Vec<u32> =
                receipt.replicas.iter().map(|r| r.replica_number).collect();
            assert_eq!(numbers, vec![0, 1]);
            for replica in &receipt.replicas {
                *leaf_usage.entry(replica.leaf.clone()).or_insert(0usize) += 1;
            }
        }

        // Every leaf sees traffic; none starved.
        for leaf in ["leaf_a", "leaf_b", "leaf_c", "leaf_d"] {
            let count = leaf_usage.get(&name(leaf)).copied().unwrap_or(0);
            assert!(count >= 3, "leaf {leaf} starved: {leaf_usage:?}");
        }
    }

    #[test]
    fn unknown_target_resource_fails_cleanly() {
        let engine = single_leaf_engine();
        let p = path("/zone/home/obj");
        let err = engine
            .ingest(
                IngestRequest::create(p.clone(), name("no_such_resc")),
                ByteSource::from_bytes(&b"bytes"[..]),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::Tree(strata_tree::TreeError::ResourceNotFound(_))
        ));
        assert!(!engine.catalog().exists(&p).unwrap());
    }

    // -----------------------------------------------------------------------
    // Atomicity, rollback, cancellation
    // -----------------------------------------------------------------------

    #[test]
    fn partial_leaf_failure_rolls_back_everything() {
        let mut builder = TreeBuilder::new();
        builder.add_replication(name("repl")).unwrap();
        for leaf in ["good", "bad"] {
            builder.add_leaf(name(leaf), location(leaf)).unwrap();
            builder.add_child(&name("repl"), &name(leaf)).unwrap();
        }
        let inner = MemoryLeafStore::new();
        let engine = IngestEngine::new(
            builder.build().unwrap(),
            InMemoryCatalog::new(),
            FailingStore {
                inner: inner.clone(),
                fail_host: "bad".into(),
            },
        );

        let p = path("/zone/home/obj");
        let err = engine
            .ingest(
                IngestRequest::create(p.clone(), name("repl")),
                ByteSource::from_bytes(arbitrary_bytes(100)),
            )
            .unwrap_err();
        assert!(matches!(err, IngestError::LeafWriteFailed { .. }));

        // No catalog record, no published bytes anywhere.
        assert!(!engine.catalog().exists(&p).unwrap());
        assert!(inner.is_empty());
        // And the object slot is free again.
        assert!(engine.catalog().begin(&p).is_ok());
    }

    #[test]
    fn cancelled_ingest_aborts_before_commit() {
        let engine = single_leaf_engine();
        let token = CancelToken::new();
        token.cancel();

        let p = path("/zone/home/obj");
        let err = engine
            .ingest(
                IngestRequest::create(p.clone(), name("demo_resc")).with_cancel(token),
                ByteSource::from_bytes(arbitrary_bytes(100)),
            )
            .unwrap_err();
        assert!(matches!(err, IngestError::Cancelled(_)));
        assert!(!engine.catalog().exists(&p).unwrap());
        assert!(engine.store().is_empty());
    }

    #[test]
    fn busy_object_fails_fast() {
        let engine = single_leaf_engine();
        let p = path("/zone/home/obj");
        let _held = engine.catalog().begin(&p).unwrap();

        let err = engine
            .ingest(
                IngestRequest::create(p.clone(), name("demo_resc")),
                ByteSource::from_bytes(&b"bytes"[..]),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::Catalog(CatalogError::ObjectBusy(_))
        ));
    }

    #[test]
    fn concurrent_ingests_on_distinct_objects_all_commit() {
        use std::sync::Arc;
        use std::thread;

        let engine = Arc::new(single_leaf_engine());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    let p = path(&format!("/zone/home/obj_{i}"));
                    engine
                        .ingest(
                            IngestRequest::create(p, name("demo_resc"))
                                .with_directive(ChecksumDirective::RegisterOnly),
                            ByteSource::from_bytes(arbitrary_bytes(64 + i)),
                        )
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread should not panic");
        }
        assert_eq!(engine.catalog().list_objects().unwrap().len(), 8);
    }

    // -----------------------------------------------------------------------
    // Streaming
    // -----------------------------------------------------------------------

    #[test]
    fn large_unsized_stream_is_chunked_and_digested() {
        let engine = single_leaf_engine();
        let data = arbitrary_bytes(200_000);
        let p = path("/zone/home/large");
        let receipt = engine
            .ingest(
                IngestRequest::create(p.clone(), name("demo_resc"))
                    .with_directive(ChecksumDirective::VerifyOnWrite),
                ByteSource::from_reader(io::Cursor::new(data.clone())),
            )
            .unwrap();

        assert_eq!(receipt.bytes_written, 200_000);
        assert_eq!(
            engine.checksum(&p).unwrap(),
            Some(digest_bytes(DigestAlgorithm::Blake3, &data))
        );
        assert_eq!(
            engine.list_replicas(&p).unwrap()[0].size,
            200_000
        );
    }

    // -----------------------------------------------------------------------
    // Queries and removal
    // -----------------------------------------------------------------------

    #[test]
    fn remove_deletes_record_and_bytes() {
        let engine = single_leaf_engine();
        let p = path("/zone/home/obj");
        engine
            .ingest(
                IngestRequest::create(p.clone(), name("demo_resc")),
                ByteSource::from_bytes(&b"bytes"[..]),
            )
            .unwrap();

        engine.remove(&p).unwrap();
        assert!(!engine.catalog().exists(&p).unwrap());
        assert!(engine.store().is_empty());
        assert!(matches!(
            engine.remove(&p),
            Err(IngestError::ObjectNotFound(_))
        ));
    }

    #[test]
    fn verify_checksum_three_way() {
        let engine = single_leaf_engine();
        let data = arbitrary_bytes(128);
        let p = path("/zone/home/obj");
        engine
            .ingest(
                IngestRequest::create(p.clone(), name("demo_resc"))
                    .with_directive(ChecksumDirective::RegisterOnly),
                ByteSource::from_bytes(data.clone()),
            )
            .unwrap();

        let recorded = digest_bytes(DigestAlgorithm::Blake3, &data);
        assert!(engine.verify_checksum(&p, &recorded).unwrap());

        let wrong = digest_bytes(DigestAlgorithm::Blake3, b"other bytes");
        assert!(!engine.verify_checksum(&p, &wrong).unwrap());

        // Cross-algorithm claims are unanswerable, not unequal.
        let cross = digest_bytes(DigestAlgorithm::Sha256, &data);
        assert!(matches!(
            engine.verify_checksum(&p, &cross),
            Err(IngestError::ChecksumAlgorithmMismatch { .. })
        ));
    }

    #[test]
    fn overwrite_preserves_replica_creation_time() {
        let engine = single_leaf_engine();
        let p = path("/zone/home/obj");
        engine
            .ingest(
                IngestRequest::create(p.clone(), name("demo_resc")),
                ByteSource::from_bytes(&b"v1"[..]),
            )
            .unwrap();
        let created = engine.list_replicas(&p).unwrap()[0].created_at;

        engine
            .ingest(
                IngestRequest::overwrite(p.clone(), name("demo_resc")),
                ByteSource::from_bytes(&b"v2 with more bytes"[..]),
            )
            .unwrap();
        let replica = engine.list_replicas(&p).unwrap().remove(0);
        assert_eq!(replica.created_at, created);
        assert!(replica.modified_at >= created);
        assert_eq!(replica.size, 18);
    }
}
