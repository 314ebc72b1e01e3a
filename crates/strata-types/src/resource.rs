use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Position of a replica within a data object's replica set.
///
/// Replica numbers are assigned by write resolution: the flattened leaf
/// targets of one ingest are numbered `0..n` in resolution order. For any
/// live object the set is contiguous and starts at zero.
pub type ReplicaNumber = u32;

/// A validated identifier of a node in the resource tree.
///
/// Names are what clients target (`-R demo_resc`) and what parent/child
/// edges reference; they must be non-empty and limited to
/// `[A-Za-z0-9._-]`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceName(String);

impl ResourceName {
    /// Validate and wrap a resource name.
    pub fn new(name: &str) -> Result<Self, TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidResourceName("empty name".into()));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(TypeError::InvalidResourceName(format!(
                "illegal character in {name:?}"
            )));
        }
        Ok(Self(name.to_string()))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceName({})", self.0)
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The physical endpoint owned by a leaf resource: a host and the vault
/// path on that host under which replica bytes are stored.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageLocation {
    /// Hostname of the storage server.
    pub host: String,
    /// Root directory of the vault on that host.
    pub vault_path: String,
}

impl StorageLocation {
    /// Build a location from host and vault path.
    pub fn new(host: impl Into<String>, vault_path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            vault_path: vault_path.into(),
        }
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.vault_path)
    }
}
