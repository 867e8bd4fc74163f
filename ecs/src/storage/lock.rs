//! Hierarchical, path-addressed locking over a component's field tree.
//!
//! A [`HierarchicalLock`] mirrors a component type's (possibly nested) field
//! structure: every leaf owns a reentrant mutex, interior nodes own none.
//! Locking an interior node means locking every descendant leaf, so a
//! system can take an exclusive hold on just the sub-fields it touches
//! without blocking work on unrelated fields of the same component.
//!
//! Unlike a plain `Mutex`, leaves are [`parking_lot::ReentrantMutex`]: the
//! same OS thread may re-enter a lock it already holds (needed because
//! locking an interior node recurses into every leaf beneath it, and a path
//! lookup that re-locks an already-held ancestor must not deadlock itself).

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

enum Node {
    Leaf(ReentrantMutex<()>),
    Interior(Vec<(&'static str, Node)>),
}

/// A lock tree isomorphic to some component type's field structure.
///
/// Construct with [`HierarchicalLock::leaf`] for a field with no further
/// substructure, or [`HierarchicalLock::interior`] to name child fields.
pub struct HierarchicalLock {
    root: Node,
}

/// RAII guard for a path lock; unlocks every leaf it locked on drop.
pub struct PathGuard<'a> {
    _guards: Vec<ReentrantMutexGuard<'a, ()>>,
}

impl HierarchicalLock {
    /// A single lockable leaf with no sub-fields.
    pub fn leaf() -> Self {
        Self {
            root: Node::Leaf(ReentrantMutex::new(())),
        }
    }

    /// An interior node naming its child fields.
    pub fn interior(children: Vec<(&'static str, HierarchicalLock)>) -> Self {
        Self {
            root: Node::Interior(children.into_iter().map(|(n, l)| (n, l.root)).collect()),
        }
    }

    fn find<'a>(node: &'a Node, path: &[&str]) -> Option<&'a Node> {
        match path.split_first() {
            None => Some(node),
            Some((head, rest)) => match node {
                Node::Leaf(_) => None,
                Node::Interior(children) => children
                    .iter()
                    .find(|(name, _)| name == head)
                    .and_then(|(_, child)| Self::find(child, rest)),
            },
        }
    }

    fn collect_leaves<'a>(node: &'a Node, out: &mut Vec<&'a ReentrantMutex<()>>) {
        match node {
            Node::Leaf(m) => out.push(m),
            Node::Interior(children) => {
                for (_, child) in children {
                    Self::collect_leaves(child, out);
                }
            }
        }
    }

    /// Lock every leaf under `path` (locking an interior node locks all of
    /// its descendants), returning a guard that releases them on drop.
    /// Returns `None` if `path` does not name a node in this tree.
    pub fn lock(&self, path: &[&str]) -> Option<PathGuard<'_>> {
        let node = Self::find(&self.root, path)?;
        let mut leaves = Vec::new();
        Self::collect_leaves(node, &mut leaves);
        let guards = leaves.iter().map(|m| m.lock()).collect();
        Some(PathGuard { _guards: guards })
    }

    /// Non-blocking variant of [`lock`](Self::lock): `Some(None)` means the
    /// path exists but is currently held by another thread; `None` means
    /// the path does not exist.
    pub fn trylock(&self, path: &[&str]) -> Option<Option<PathGuard<'_>>> {
        let node = Self::find(&self.root, path)?;
        let mut leaves = Vec::new();
        Self::collect_leaves(node, &mut leaves);
        let mut guards = Vec::with_capacity(leaves.len());
        for m in &leaves {
            match m.try_lock() {
                Some(g) => guards.push(g),
                None => return Some(None),
            }
        }
        Some(Some(PathGuard { _guards: guards }))
    }

    /// Whether every leaf under `path` is currently held by some thread.
    /// Returns `false` for a path that does not exist.
    pub fn islocked(&self, path: &[&str]) -> bool {
        let Some(node) = Self::find(&self.root, path) else {
            return false;
        };
        let mut leaves = Vec::new();
        Self::collect_leaves(node, &mut leaves);
        !leaves.is_empty() && leaves.iter().all(|m| m.is_locked())
    }
}
