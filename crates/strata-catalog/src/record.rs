use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use strata_types::{ChecksumState, ChecksumValue, LogicalPath, ReplicaNumber, ResourceName, StorageLocation};

/// One physical copy of a data object at one leaf resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replica {
    /// Position within the object's replica set (contiguous from 0).
    pub replica_number: ReplicaNumber,
    /// The leaf resource holding the bytes.
    pub leaf: ResourceName,
    /// Physical endpoint of that leaf.
    pub location: StorageLocation,
    /// Whether the recorded digest describes the current bytes.
    pub checksum: ChecksumState,
    /// Payload size in bytes.
    pub size: u64,
    /// When this replica was first cut.
    pub created_at: DateTime<Utc>,
    /// When its bytes were last rewritten.
    pub modified_at: DateTime<Utc>,
}

/// A data object: a logical path plus its live replica set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataObject {
    /// The object's logical identity.
    pub path: LogicalPath,
    /// Replicas keyed by replica number.
    pub replicas: BTreeMap<ReplicaNumber, Replica>,
}

impl DataObject {
    /// Build an object from an already-validated replica set.
    pub fn new(path: LogicalPath, replicas: Vec<Replica>) -> Self {
        Self {
            path,
            replicas: replicas
                .into_iter()
                .map(|r| (r.replica_number, r))
                .collect(),
        }
    }

    /// Look up a replica by number.
    pub fn replica(&self, number: ReplicaNumber) -> Option<&Replica> {
        self.replicas.get(&number)
    }

    /// Number of live replicas.
    pub fn replica_count(&self) -> usize {
        self.replicas.len()
    }

    /// The object-level checksum: replica 0's digest, when verified.
    ///
    /// This is what the external query surface reports; absent and stale
    /// states both surface as "no checksum".
    pub fn checksum(&self) -> Option<&ChecksumValue> {
        self.replicas.get(&0).and_then(|r| r.checksum.verified())
    }
}
