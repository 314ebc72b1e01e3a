//! Resource hierarchy and write resolution for strata.
//!
//! Storage resources compose into a rooted, acyclic hierarchy. Leaves own
//! physical storage; interior nodes only route: a passthrough forwards to
//! its single child, a random-selection node picks exactly one child per
//! write, and a replication node fans a write out to every child. Resolving
//! a write against a node flattens that routing into an ordered list of
//! leaf targets, numbered `0..n` — those numbers become the replica numbers
//! recorded in the catalog.
//!
//! Topology is built once with [`TreeBuilder`], validated at `build`, and
//! immutable afterwards; [`ResourceTree::resolve`] is read-only and takes
//! no locks.
//!
//! # Key Types
//!
//! - [`ResourceNode`] / [`NodeKind`] — one element of the hierarchy
//! - [`TreeBuilder`] — admin surface: declare resources and parent/child edges
//! - [`ResourceTree`] — immutable topology with `resolve` and ASCII rendering
//! - [`SelectionPolicy`] — pluggable child choice for random-selection nodes
//! - [`LeafTarget`] — one resolved physical destination with its replica number

pub mod error;
pub mod node;
pub mod policy;
pub mod tree;

pub use error::TreeError;
pub use node::{NodeKind, ResourceNode};
pub use policy::{HashedSelection, SelectionPolicy, UniformSelection};
pub use tree::{LeafTarget, ResourceTree, TreeBuilder, WriteContext};
