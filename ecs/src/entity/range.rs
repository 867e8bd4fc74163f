//! Lazily-linked entity handles for bulk-spawned rows.

use std::collections::HashSet;
use std::ops::Range;

use crate::component::Signature;
use crate::entity::Entity;

/// One or more contiguous runs of rows allocated by `request_entity`, none
/// of which have necessarily been linked into the world's entity-identity
/// bookkeeping yet.
///
/// Bulk spawns are common ("spawn 10,000 particles") and callers frequently
/// never need a handle to any individual row - they iterate the rows with a
/// query instead. Every row's [`Entity`] id is drawn from the same
/// [`crate::entity::Allocator`] sequence `create_entity` uses (so a bulk
/// spawn can never mint an id that collides with one handed out elsewhere),
/// but `EntityRange` defers the more expensive step - linking an id into the
/// world's location/slot tables and wiring its parent edge - until
/// [`get_entity`] is actually called for a given offset.
///
/// A single bulk request can land across more than one physical
/// [`TableRange`](crate::storage::TableRange) if the partition's existing
/// to-fill capacity only absorbed part of it, so this holds a list of
/// sub-spans rather than one `start..end` pair; they are still addressed as
/// one logical `0..len()` sequence.
///
/// [`get_entity`]: EntityRange::get_entity
#[derive(Debug, Clone)]
pub struct EntityRange {
    spans: Vec<Range<usize>>,
    signature: Signature,
    parent: Option<Entity>,
    /// Entity handle pre-allocated for each logical offset, one per row,
    /// drawn from the world's allocator at `request_entity` time so its id
    /// space never aliases a physical row-id.
    entities: Vec<Entity>,
    /// Offsets (relative to the start of the logical sequence) whose entity
    /// record has been linked into the world already.
    materialized: HashSet<usize>,
}

impl EntityRange {
    /// Construct a range over the given (row-id) spans, all sharing
    /// `signature`, optionally parented under `parent`. `spans` must be
    /// non-empty and in ascending order, and `entities` must have exactly
    /// one handle per row across every span (already allocated from the
    /// world's `Allocator`, never derived from a row-id).
    pub(crate) fn new(spans: Vec<Range<usize>>, signature: Signature, parent: Option<Entity>, entities: Vec<Entity>) -> Self {
        debug_assert!(!spans.is_empty());
        debug_assert_eq!(entities.len(), spans.iter().map(Range::len).sum::<usize>());
        Self { spans, signature, parent, entities, materialized: HashSet::new() }
    }

    /// Row-id of the first row in this range.
    #[inline]
    pub fn start(&self) -> usize {
        self.spans[0].start
    }

    /// Row-id of the last row in this range (inclusive).
    #[inline]
    pub fn end(&self) -> usize {
        self.spans[self.spans.len() - 1].end - 1
    }

    /// Number of rows spanned by this range.
    #[inline]
    pub fn len(&self) -> usize {
        self.spans.iter().map(|r| r.len()).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The physical row spans backing this range, in ascending order.
    #[inline]
    pub fn spans(&self) -> &[Range<usize>] {
        &self.spans
    }

    /// Archetype signature shared by every row in this range.
    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Number of rows that have had an `Entity` record linked into the
    /// world so far.
    #[inline]
    pub fn init(&self) -> usize {
        self.materialized.len()
    }

    /// Map a logical offset `0 <= k < len()` to its physical row-id.
    pub(crate) fn row_of(&self, k: usize) -> Option<usize> {
        let mut remaining = k;
        for span in &self.spans {
            if remaining < span.len() {
                return Some(span.start + remaining);
            }
            remaining -= span.len();
        }
        None
    }

    /// The entity handle pre-allocated for the `k`th row in this range
    /// (`0 <= k < len()`), returning `None` if `k` is out of range.
    ///
    /// The handle itself was minted up front (at `request_entity` time) from
    /// the world's `Allocator`, so repeated calls for the same `k` always
    /// return the same id and generation; the first call additionally marks
    /// the offset as linked, for [`init`](Self::init)'s bookkeeping.
    pub fn get_entity(&mut self, k: usize) -> Option<Entity> {
        let entity = *self.entities.get(k)?;
        self.materialized.insert(k);
        Some(entity)
    }

    /// The parent entity rows in this range were spawned under, if any.
    #[inline]
    pub fn parent(&self) -> Option<Entity> {
        self.parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Id as ComponentId;
    use crate::entity::{Generation, Id};

    fn sig() -> Signature {
        Signature::of(ComponentId::new(0))
    }

    fn entities(n: usize) -> Vec<Entity> {
        (0..n).map(|i| Entity::new_with_generation(Id::from(100 + i as u32), Generation::FIRST)).collect()
    }

    #[test]
    fn single_span_get_entity_round_trips() {
        let mut range = EntityRange::new(vec![10..15], sig(), None, entities(5));

        assert_eq!(range.len(), 5);
        assert_eq!(range.get_entity(0).unwrap().id(), Id::from(100));
        assert_eq!(range.get_entity(4).unwrap().id(), Id::from(104));
        assert!(range.get_entity(5).is_none());
        assert_eq!(range.init(), 2);
    }

    #[test]
    fn multi_span_maps_logical_offset_across_spans() {
        let range = EntityRange::new(vec![0..3, 10..12], sig(), None, entities(5));

        assert_eq!(range.len(), 5);
        assert_eq!(range.start(), 0);
        assert_eq!(range.end(), 11);
        assert_eq!(range.row_of(2), Some(2));
        assert_eq!(range.row_of(3), Some(10));
        assert_eq!(range.row_of(4), Some(11));
    }

    #[test]
    fn get_entity_is_idempotent_and_never_aliases_a_row_id() {
        // The whole point of pre-allocating entities from the world's
        // allocator: a row's physical row-id (here, 10) must not leak into
        // the entity id (here, 100) that identifies it.
        let mut range = EntityRange::new(vec![10..11], sig(), None, entities(1));

        let first = range.get_entity(0).unwrap();
        let second = range.get_entity(0).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.id(), Id::from(100));
        assert_ne!(first.id(), Id::from(10));
    }
}
