//! The 128-bit archetype signature.

use fixedbitset::FixedBitSet;

use crate::component::{Id, MAX_COMPONENTS};

/// A bitset keyed by component [`Id`]: bit `b` is set iff the archetype
/// includes the component registered at index `b`.
///
/// `Signature::EMPTY` (the zero value) is the empty archetype. Signatures
/// are compared and combined with ordinary bitset operations, which is what
/// lets the query engine resolve `(required, forbidden)` masks against every
/// partition's signature in O(words) rather than O(component count).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Signature(FixedBitSet);

impl Signature {
    /// Construct an all-zero signature.
    pub fn empty() -> Self {
        Self(FixedBitSet::with_capacity(MAX_COMPONENTS))
    }

    /// A signature with exactly one bit set.
    pub fn of(id: Id) -> Self {
        let mut sig = Self::empty();
        sig.set(id, true);
        sig
    }

    /// Build a signature from an iterator of component ids.
    pub fn from_ids(ids: impl IntoIterator<Item = Id>) -> Self {
        let mut sig = Self::empty();
        for id in ids {
            sig.set(id, true);
        }
        sig
    }

    /// Set or clear the bit for `id`.
    pub fn set(&mut self, id: Id, value: bool) {
        self.0.set(id.index(), value);
    }

    /// Whether `id`'s bit is set.
    pub fn contains(&self, id: Id) -> bool {
        self.0.contains(id.index())
    }

    /// Whether every bit set in `other` is also set in `self`.
    pub fn contains_all(&self, other: &Signature) -> bool {
        other.0.is_subset(&self.0)
    }

    /// Whether this signature has no bits set.
    pub fn is_empty(&self) -> bool {
        self.0.count_ones(..) == 0
    }

    /// Union of `self` and `other`.
    pub fn union(&self, other: &Signature) -> Signature {
        let mut out = self.0.clone();
        out.union_with(&other.0);
        Signature(out)
    }

    /// Intersection of `self` and `other`.
    pub fn intersection(&self, other: &Signature) -> Signature {
        let mut out = self.0.clone();
        out.intersect_with(&other.0);
        Signature(out)
    }

    /// `self` with every bit in `other` cleared.
    pub fn difference(&self, other: &Signature) -> Signature {
        let mut out = self.0.clone();
        out.difference_with(&other.0);
        Signature(out)
    }

    /// Iterate the set component ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.0.ones().map(Id::from)
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::empty()
    }
}
