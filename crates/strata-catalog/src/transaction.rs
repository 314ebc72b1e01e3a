use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use strata_types::LogicalPath;

use crate::record::DataObject;

/// Identifier of one ingest transaction, for logs and receipts.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The set of logical paths with an ingest transaction in flight.
///
/// Shared between a catalog and the slot guards it hands out. Claiming is
/// fail-fast: the caller either takes the slot or learns it is busy.
/// Catalog implementations embed one of these to satisfy the per-object
/// exclusion contract.
#[derive(Clone, Default)]
pub struct InFlightSet {
    paths: Arc<Mutex<HashSet<LogicalPath>>>,
}

impl InFlightSet {
    /// Create an empty in-flight set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `path`. Returns `None` if already claimed.
    pub fn claim(&self, path: &LogicalPath) -> Option<SlotGuard> {
        let mut paths = self.paths.lock().expect("lock poisoned");
        if !paths.insert(path.clone()) {
            return None;
        }
        Some(SlotGuard {
            paths: Arc::clone(&self.paths),
            path: path.clone(),
        })
    }
}

/// Exclusive ownership of one object's in-flight slot; released on drop.
pub struct SlotGuard {
    paths: Arc<Mutex<HashSet<LogicalPath>>>,
    path: LogicalPath,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if let Ok(mut paths) = self.paths.lock() {
            paths.remove(&self.path);
        }
    }
}

/// An open per-object ingest transaction.
///
/// Holds the object's exclusive write slot and a snapshot of its state at
/// `begin` time. Consumed by `commit`, `abort`, or `remove`; if simply
/// dropped (caller error, panic unwinding) the slot is released and no
/// catalog state changes — drop is an implicit abort.
pub struct IngestTransaction {
    id: TransactionId,
    path: LogicalPath,
    existing: Option<DataObject>,
    _slot: SlotGuard,
}

impl IngestTransaction {
    /// Open a transaction over a claimed slot and a state snapshot.
    /// Called by catalog implementations from `begin`.
    pub fn new(path: LogicalPath, existing: Option<DataObject>, slot: SlotGuard) -> Self {
        Self {
            id: TransactionId::new(),
            path,
            existing,
            _slot: slot,
        }
    }

    /// This transaction's identifier.
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// The object this transaction locks.
    pub fn path(&self) -> &LogicalPath {
        &self.path
    }

    /// The object's state when the transaction began, if it existed.
    pub fn existing(&self) -> Option<&DataObject> {
        self.existing.as_ref()
    }
}

impl fmt::Debug for IngestTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestTransaction")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("preexisting", &self.existing.is_some())
            .finish()
    }
}
