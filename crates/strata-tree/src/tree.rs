use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use strata_types::{LogicalPath, ReplicaNumber, ResourceName, StorageLocation};

use crate::error::TreeError;
use crate::node::{NodeKind, ResourceNode};
use crate::policy::{HashedSelection, SelectionPolicy};

/// Per-write input to resolution.
///
/// The write serial is the engine's monotonic counter; together with the
/// object path it seeds deterministic selection policies, so selection is
/// re-evaluated for every top-level write rather than cached per object.
#[derive(Clone, Debug)]
pub struct WriteContext {
    /// Logical path of the object being written.
    pub path: LogicalPath,
    /// Monotonic ingest counter, unique per top-level write.
    pub write_serial: u64,
}

/// One resolved physical destination for a write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafTarget {
    /// Position in the flattened resolution, and therefore the replica
    /// number the catalog will record.
    pub replica_number: ReplicaNumber,
    /// The leaf resource that accepts the bytes.
    pub leaf: ResourceName,
    /// Where the leaf stores them.
    pub location: StorageLocation,
    /// Nodes traversed from the resolution target down to this leaf.
    pub chain: Vec<ResourceName>,
}

/// Declarative topology construction.
///
/// Mirrors the admin surface of the hierarchy: declare each resource, then
/// wire parent/child edges. Structural rules are enforced eagerly where
/// possible (unknown names, duplicate names, second parents, edges out of
/// leaves, ancestry cycles) and the rest at [`build`](Self::build)
/// (child-count rules per node kind).
pub struct TreeBuilder {
    nodes: BTreeMap<ResourceName, ResourceNode>,
    parents: HashMap<ResourceName, ResourceName>,
    policy: Box<dyn SelectionPolicy>,
}

impl std::fmt::Debug for TreeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeBuilder")
            .field("nodes", &self.nodes)
            .field("parents", &self.parents)
            .finish_non_exhaustive()
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    /// Start an empty topology with the default (hashed) selection policy.
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            parents: HashMap::new(),
            policy: Box::new(HashedSelection),
        }
    }

    /// Replace the selection policy used by random-selection nodes.
    pub fn with_policy(mut self, policy: Box<dyn SelectionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    fn add_node(&mut self, name: ResourceName, kind: NodeKind) -> Result<&mut Self, TreeError> {
        if self.nodes.contains_key(&name) {
            return Err(TreeError::DuplicateResource(name));
        }
        self.nodes.insert(
            name.clone(),
            ResourceNode {
                name,
                kind,
                children: Vec::new(),
            },
        );
        Ok(self)
    }

    /// Declare a leaf resource owning physical storage.
    pub fn add_leaf(
        &mut self,
        name: ResourceName,
        location: StorageLocation,
    ) -> Result<&mut Self, TreeError> {
        self.add_node(name, NodeKind::Leaf(location))
    }

    /// Declare a passthrough resource.
    pub fn add_passthrough(&mut self, name: ResourceName) -> Result<&mut Self, TreeError> {
        self.add_node(name, NodeKind::Passthrough)
    }

    /// Declare a random-selection resource.
    pub fn add_random(&mut self, name: ResourceName) -> Result<&mut Self, TreeError> {
        self.add_node(name, NodeKind::RandomSelection)
    }

    /// Declare a replication resource.
    pub fn add_replication(&mut self, name: ResourceName) -> Result<&mut Self, TreeError> {
        self.add_node(name, NodeKind::Replication)
    }

    /// Wire `child` under `parent`, in declaration order.
    pub fn add_child(
        &mut self,
        parent: &ResourceName,
        child: &ResourceName,
    ) -> Result<&mut Self, TreeError> {
        if !self.nodes.contains_key(child) {
            return Err(TreeError::ResourceNotFound(child.clone()));
        }
        let parent_node = self
            .nodes
            .get(parent)
            .ok_or_else(|| TreeError::ResourceNotFound(parent.clone()))?;
        if parent_node.kind.is_leaf() {
            return Err(TreeError::ResourceTreeInvalid {
                resource: parent.clone(),
                reason: "leaf resources cannot have children".into(),
            });
        }
        if let Some(existing) = self.parents.get(child) {
            return Err(TreeError::ParentConflict {
                child: child.clone(),
                parent: existing.clone(),
            });
        }
        // Walk the ancestry of the parent; finding the child there would
        // close a cycle.
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                return Err(TreeError::ResourceTreeInvalid {
                    resource: child.clone(),
                    reason: format!("adding {child} under {parent} would create a cycle"),
                });
            }
            cursor = self.parents.get(current);
        }

        self.parents.insert(child.clone(), parent.clone());
        self.nodes
            .get_mut(parent)
            .expect("parent existence checked above")
            .children
            .push(child.clone());
        Ok(self)
    }

    /// Validate child-count rules and freeze the topology.
    pub fn build(self) -> Result<ResourceTree, TreeError> {
        for node in self.nodes.values() {
            match &node.kind {
                NodeKind::Leaf(_) => {}
                NodeKind::Passthrough => {
                    if node.children.len() != 1 {
                        return Err(TreeError::ResourceTreeInvalid {
                            resource: node.name.clone(),
                            reason: format!(
                                "passthrough requires exactly one child, has {}",
                                node.children.len()
                            ),
                        });
                    }
                }
                NodeKind::RandomSelection | NodeKind::Replication => {
                    if node.children.is_empty() {
                        return Err(TreeError::ResourceTreeInvalid {
                            resource: node.name.clone(),
                            reason: "selection node has no children".into(),
                        });
                    }
                }
            }
        }
        Ok(ResourceTree {
            nodes: self.nodes,
            policy: self.policy,
        })
    }
}

/// An immutable, validated resource hierarchy.
///
/// Holds a forest: several independent hierarchies (or standalone leaves)
/// may coexist, and a write may target any node by name. Resolution is
/// read-only; the topology never changes after `build`, so no locking is
/// needed for concurrent resolves.
pub struct ResourceTree {
    nodes: BTreeMap<ResourceName, ResourceNode>,
    policy: Box<dyn SelectionPolicy>,
}

impl ResourceTree {
    /// Look up a node by name.
    pub fn node(&self, name: &ResourceName) -> Option<&ResourceNode> {
        self.nodes.get(name)
    }

    /// Returns `true` if a resource with this name exists.
    pub fn contains(&self, name: &ResourceName) -> bool {
        self.nodes.contains_key(name)
    }

    /// Number of declared resources.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no resources are declared.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Names of all nodes that have no parent, in name order.
    pub fn roots(&self) -> Vec<&ResourceName> {
        let children: HashSet<&ResourceName> = self
            .nodes
            .values()
            .flat_map(|n| n.children.iter())
            .collect();
        self.nodes
            .keys()
            .filter(|name| !children.contains(name))
            .collect()
    }

    /// Resolve a write against `target`, flattening the routing into leaf
    /// targets numbered `0..n` in resolution order.
    ///
    /// Deterministic and repeatable for a fixed topology and context when
    /// the selection policy is deterministic; random-selection choices are
    /// re-evaluated on every call.
    pub fn resolve(
        &self,
        target: &ResourceName,
        ctx: &WriteContext,
    ) -> Result<Vec<LeafTarget>, TreeError> {
        let node = self
            .nodes
            .get(target)
            .ok_or_else(|| TreeError::ResourceNotFound(target.clone()))?;

        let mut chain = Vec::new();
        let mut targets = Vec::new();
        self.resolve_node(node, ctx, &mut chain, &mut targets)?;

        for (index, leaf_target) in targets.iter_mut().enumerate() {
            leaf_target.replica_number = index as ReplicaNumber;
        }
        debug!(
            target = %target,
            path = %ctx.path,
            serial = ctx.write_serial,
            leaves = targets.len(),
            "resolved write"
        );
        Ok(targets)
    }

    fn resolve_node(
        &self,
        node: &ResourceNode,
        ctx: &WriteContext,
        chain: &mut Vec<ResourceName>,
        out: &mut Vec<LeafTarget>,
    ) -> Result<(), TreeError> {
        chain.push(node.name.clone());
        let result = match &node.kind {
            NodeKind::Leaf(location) => {
                out.push(LeafTarget {
                    replica_number: 0,
                    leaf: node.name.clone(),
                    location: location.clone(),
                    chain: chain.clone(),
                });
                Ok(())
            }
            NodeKind::Passthrough => self.resolve_child(node, 0, ctx, chain, out),
            NodeKind::Replication => {
                for index in 0..node.children.len() {
                    self.resolve_child(node, index, ctx, chain, out)?;
                }
                Ok(())
            }
            NodeKind::RandomSelection => {
                if node.children.is_empty() {
                    Err(TreeError::ResourceTreeInvalid {
                        resource: node.name.clone(),
                        reason: "selection node has no children".into(),
                    })
                } else {
                    let index = self.policy.choose(ctx, &node.name, node.children.len());
                    self.resolve_child(node, index, ctx, chain, out)
                }
            }
        };
        chain.pop();
        result
    }

    fn resolve_child(
        &self,
        node: &ResourceNode,
        index: usize,
        ctx: &WriteContext,
        chain: &mut Vec<ResourceName>,
        out: &mut Vec<LeafTarget>,
    ) -> Result<(), TreeError> {
        let child_name = node.children.get(index).ok_or_else(|| {
            TreeError::ResourceTreeInvalid {
                resource: node.name.clone(),
                reason: format!("child index {index} out of range"),
            }
        })?;
        let child = self
            .nodes
            .get(child_name)
            .ok_or_else(|| TreeError::ResourceNotFound(child_name.clone()))?;
        self.resolve_node(child, ctx, chain, out)
    }

    /// Render the hierarchy for operators, one root per block.
    pub fn render_ascii(&self) -> String {
        let mut output = String::new();
        for root in self.roots() {
            if let Some(node) = self.nodes.get(root) {
                self.render_node(node, "", true, true, &mut output);
            }
        }
        output
    }

    fn render_node(
        &self,
        node: &ResourceNode,
        prefix: &str,
        is_last: bool,
        is_root: bool,
        output: &mut String,
    ) {
        let label = match node.location() {
            Some(location) => format!("{}:{} {}", node.name, node.kind.tag(), location),
            None => format!("{}:{}", node.name, node.kind.tag()),
        };
        if is_root {
            output.push_str(&label);
            output.push('\n');
        } else {
            let branch = if is_last { "└── " } else { "├── " };
            output.push_str(prefix);
            output.push_str(branch);
            output.push_str(&label);
            output.push('\n');
        }
        let child_prefix = if is_root {
            String::new()
        } else {
            format!("{prefix}{}", if is_last { "    " } else { "│   " })
        };
        for (index, child_name) in node.children.iter().enumerate() {
            if let Some(child) = self.nodes.get(child_name) {
                let last = index + 1 == node.children.len();
                self.render_node(child, &child_prefix, last, false, output);
            }
        }
    }
}

impl std::fmt::Debug for ResourceTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceTree")
            .field("resources", &self.nodes.len())
            .finish()
    }
}
