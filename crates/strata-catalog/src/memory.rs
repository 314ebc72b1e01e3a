use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use strata_types::{ChecksumValue, LogicalPath};

use crate::error::{CatalogError, CatalogResult};
use crate::record::{DataObject, Replica};
use crate::traits::ReplicaCatalog;
use crate::transaction::{InFlightSet, IngestTransaction};

/// In-memory, `HashMap`-based replica catalog.
///
/// Intended for embedding and tests. Object records live behind a
/// `RwLock`; the in-flight transaction set is tracked separately so that
/// readers are never blocked by an open transaction — only a second
/// *writer* of the same path is refused.
pub struct InMemoryCatalog {
    objects: RwLock<HashMap<LogicalPath, DataObject>>,
    in_flight: InFlightSet,
}

impl InMemoryCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            in_flight: InFlightSet::new(),
        }
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no objects are recorded.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    fn validate_replica_set(path: &LogicalPath, replicas: &[Replica]) -> CatalogResult<()> {
        if replicas.is_empty() {
            return Err(CatalogError::InvalidReplicaSet {
                path: path.clone(),
                reason: "empty replica set".into(),
            });
        }
        for (index, replica) in replicas.iter().enumerate() {
            if replica.replica_number as usize != index {
                return Err(CatalogError::InvalidReplicaSet {
                    path: path.clone(),
                    reason: format!(
                        "replica numbers must be contiguous from 0; found {} at position {index}",
                        replica.replica_number
                    ),
                });
            }
        }
        for (index, replica) in replicas.iter().enumerate() {
            if replicas[..index].iter().any(|r| r.leaf == replica.leaf) {
                return Err(CatalogError::InvalidReplicaSet {
                    path: path.clone(),
                    reason: format!("duplicate leaf resource {}", replica.leaf),
                });
            }
        }
        Ok(())
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicaCatalog for InMemoryCatalog {
    fn begin(&self, path: &LogicalPath) -> CatalogResult<IngestTransaction> {
        let slot = self
            .in_flight
            .claim(path)
            .ok_or_else(|| CatalogError::ObjectBusy(path.clone()))?;
        let existing = self
            .objects
            .read()
            .expect("lock poisoned")
            .get(path)
            .cloned();
        let txn = IngestTransaction::new(path.clone(), existing, slot);
        debug!(txn = %txn.id(), path = %path, "transaction opened");
        Ok(txn)
    }

    fn commit(&self, txn: IngestTransaction, replicas: Vec<Replica>) -> CatalogResult<()> {
        let path = txn.path().clone();
        Self::validate_replica_set(&path, &replicas)?;
        let object = DataObject::new(path.clone(), replicas);
        let mut objects = self.objects.write().expect("lock poisoned");
        // Wholesale replacement: any prior replica set for this path is
        // superseded in the same swap, leaving no ghost replicas.
        objects.insert(path.clone(), object);
        debug!(txn = %txn.id(), path = %path, "transaction committed");
        Ok(())
    }

    fn abort(&self, txn: IngestTransaction) {
        debug!(txn = %txn.id(), path = %txn.path(), "transaction aborted");
        // Dropping the transaction releases the slot; nothing else to do.
    }

    fn remove(&self, txn: IngestTransaction) -> CatalogResult<()> {
        let path = txn.path().clone();
        if txn.existing().is_none() {
            return Err(CatalogError::ObjectNotFound(path));
        }
        let mut objects = self.objects.write().expect("lock poisoned");
        objects.remove(&path);
        debug!(txn = %txn.id(), path = %path, "object removed");
        Ok(())
    }

    fn get_checksum(&self, path: &LogicalPath) -> CatalogResult<Option<ChecksumValue>> {
        let objects = self.objects.read().expect("lock poisoned");
        let object = objects
            .get(path)
            .ok_or_else(|| CatalogError::ObjectNotFound(path.clone()))?;
        Ok(object.checksum().copied())
    }

    fn list_replicas(&self, path: &LogicalPath) -> CatalogResult<Vec<Replica>> {
        let objects = self.objects.read().expect("lock poisoned");
        let object = objects
            .get(path)
            .ok_or_else(|| CatalogError::ObjectNotFound(path.clone()))?;
        Ok(object.replicas.values().cloned().collect())
    }

    fn get_object(&self, path: &LogicalPath) -> CatalogResult<DataObject> {
        let objects = self.objects.read().expect("lock poisoned");
        objects
            .get(path)
            .cloned()
            .ok_or_else(|| CatalogError::ObjectNotFound(path.clone()))
    }

    fn exists(&self, path: &LogicalPath) -> CatalogResult<bool> {
        Ok(self
            .objects
            .read()
            .expect("lock poisoned")
            .contains_key(path))
    }

    fn list_objects(&self) -> CatalogResult<Vec<LogicalPath>> {
        let objects = self.objects.read().expect("lock poisoned");
        let mut paths: Vec<LogicalPath> = objects.keys().cloned().collect();
        paths.sort();
        Ok(paths)
    }
}

impl std::fmt::Debug for InMemoryCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCatalog")
            .field("object_count", &self.len())
            .finish()
    }
}
