use serde::{Deserialize, Serialize};

use strata_types::{ResourceName, StorageLocation};

/// The placement behavior of a resource node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Owns physical storage and accepts writes directly.
    Leaf(StorageLocation),
    /// Forwards every write unchanged to its single child.
    Passthrough,
    /// Routes each independent write to exactly one child.
    RandomSelection,
    /// Fans a single write out to all children as distinct replicas.
    Replication,
}

impl NodeKind {
    /// Short tag used in listings (`lsresc`) and logs.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Leaf(_) => "leaf",
            Self::Passthrough => "passthru",
            Self::RandomSelection => "random",
            Self::Replication => "replication",
        }
    }

    /// Returns `true` for the leaf variant.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }
}

/// One element of the resource hierarchy: a name, a placement kind, and
/// the ordered child edges declared for it.
///
/// Child order is load-bearing: replication fan-out concatenates child
/// resolutions in declared order, which fixes replica numbering for a
/// given topology.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceNode {
    /// The node's unique name within the tree.
    pub name: ResourceName,
    /// Placement behavior.
    pub kind: NodeKind,
    /// Ordered children (empty for leaves).
    pub children: Vec<ResourceName>,
}

impl ResourceNode {
    /// The storage location, for leaves.
    pub fn location(&self) -> Option<&StorageLocation> {
        match &self.kind {
            NodeKind::Leaf(location) => Some(location),
            _ => None,
        }
    }
}
