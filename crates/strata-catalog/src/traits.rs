use strata_types::{ChecksumValue, LogicalPath};

use crate::error::CatalogResult;
use crate::record::{DataObject, Replica};
use crate::transaction::IngestTransaction;

/// The replica catalog: authoritative store of object → replica mappings.
///
/// All implementations must satisfy these invariants:
/// - At most one in-flight transaction per logical path; `begin` fails
///   fast with `ObjectBusy` rather than blocking.
/// - `commit` replaces the object's replica set atomically — readers see
///   either the whole prior set or the whole new set, never a mix, and no
///   replica survives at a leaf the committing write did not target.
/// - Replica numbers in a committed set are contiguous from 0 and no two
///   replicas share a leaf.
/// - Queries on paths with no live object report `ObjectNotFound`; they
///   never invent empty objects.
pub trait ReplicaCatalog: Send + Sync {
    /// Open a transaction for `path`, claiming its exclusive write slot
    /// and snapshotting any existing object state.
    fn begin(&self, path: &LogicalPath) -> CatalogResult<IngestTransaction>;

    /// Atomically install `replicas` as the object's complete replica set.
    ///
    /// Creates the object if the transaction snapshot was empty, replaces
    /// it wholesale otherwise. Consumes the transaction; the write slot is
    /// released either way.
    fn commit(&self, txn: IngestTransaction, replicas: Vec<Replica>) -> CatalogResult<()>;

    /// Abandon the transaction without touching catalog state.
    fn abort(&self, txn: IngestTransaction);

    /// Delete the object this transaction locks.
    ///
    /// Fails with `ObjectNotFound` if the snapshot shows no live object.
    fn remove(&self, txn: IngestTransaction) -> CatalogResult<()>;

    /// The object-level checksum: `Some` only when replica 0 is verified.
    ///
    /// `Ok(None)` is the externally observable "empty checksum" marker for
    /// absent and stale states alike.
    fn get_checksum(&self, path: &LogicalPath) -> CatalogResult<Option<ChecksumValue>>;

    /// All live replicas of an object, in replica-number order.
    fn list_replicas(&self, path: &LogicalPath) -> CatalogResult<Vec<Replica>>;

    /// The full object record.
    fn get_object(&self, path: &LogicalPath) -> CatalogResult<DataObject>;

    /// Whether a live object exists at `path`.
    fn exists(&self, path: &LogicalPath) -> CatalogResult<bool>;

    /// All live object paths, sorted.
    fn list_objects(&self) -> CatalogResult<Vec<LogicalPath>>;
}
