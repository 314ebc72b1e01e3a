use rand::Rng;

use strata_types::ResourceName;

use crate::tree::WriteContext;

/// Child choice for random-selection nodes.
///
/// Implementations must be approximately uniform across children over
/// repeated writes to distinct objects, and are invoked once per
/// random-selection node per top-level write — never cached per object.
pub trait SelectionPolicy: Send + Sync {
    /// Choose a child index in `0..arity` for the given write.
    fn choose(&self, ctx: &WriteContext, node: &ResourceName, arity: usize) -> usize;
}

/// Deterministic selection: a hash of the object path, the write serial,
/// and the node name picks the child.
///
/// Repeatable for a fixed topology and write context, which keeps
/// resolution testable; distinct objects (and distinct serials) spread
/// approximately uniformly across children.
#[derive(Debug, Default)]
pub struct HashedSelection;

impl SelectionPolicy for HashedSelection {
    fn choose(&self, ctx: &WriteContext, node: &ResourceName, arity: usize) -> usize {
        debug_assert!(arity > 0);
        let mut hasher = blake3::Hasher::new();
        hasher.update(ctx.path.as_string().as_bytes());
        hasher.update(&ctx.write_serial.to_le_bytes());
        hasher.update(node.as_str().as_bytes());
        let digest = hasher.finalize();
        let mut word = [0u8; 8];
        word.copy_from_slice(&digest.as_bytes()[..8]);
        (u64::from_le_bytes(word) % arity as u64) as usize
    }
}

/// Uniform random selection, re-drawn independently for every write.
#[derive(Debug, Default)]
pub struct UniformSelection;

impl SelectionPolicy for UniformSelection {
    fn choose(&self, _ctx: &WriteContext, _node: &ResourceName, arity: usize) -> usize {
        debug_assert!(arity > 0);
        rand::thread_rng().gen_range(0..arity)
    }
}
