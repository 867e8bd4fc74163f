//! The partitioned, column-major row store.
//!
//! A [`Table`] owns every [`Column`] in a world and groups live rows into
//! [`Partition`]s keyed by archetype [`Signature`]. Each partition holds an
//! ordered list of [`TableRange`]s - contiguous row-id intervals that all
//! carry exactly that archetype's components - so queries can hand a system
//! a handful of ranges to walk instead of a scattered row list.

use std::any::TypeId;
use std::collections::HashMap;
use std::ops::Range;

use crate::component::{self, Component, Info, Signature};
use crate::storage::column::{AnyColumn, Column};

/// Default capacity given to a freshly created range within a partition.
pub const DEFAULT_CAPACITY: usize = 4096;

/// A contiguous block of row-ids within one partition.
///
/// `start..=end` (inclusive) are the live rows; `end - start + 1 <= capacity`
/// and the remainder, up to `start + capacity - 1`, is reserved but unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRange {
    pub start: usize,
    pub end: usize,
    pub capacity: usize,
}

impl TableRange {
    /// A freshly created range with zero live rows. We can't express "zero
    /// live rows" with a plain inclusive range without a sentinel, so an
    /// empty range is encoded as `end == start.wrapping_sub(1)` and every
    /// reader goes through [`len`](Self::len)/[`is_empty`](Self::is_empty)
    /// rather than touching `end` directly.
    fn new(start: usize, capacity: usize) -> Self {
        Self { start, end: start.wrapping_sub(1), capacity }
    }

    /// Number of live rows in this range.
    #[inline]
    pub fn len(&self) -> usize {
        if self.end < self.start { 0 } else { self.end - self.start + 1 }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn has_space(&self) -> bool {
        self.len() < self.capacity
    }

    /// The live rows as a half-open `Range<usize>`.
    #[inline]
    pub fn live(&self) -> Range<usize> {
        self.start..(self.start + self.len())
    }
}

/// All rows sharing one archetype signature: an ordered list of ranges plus
/// a side list of range indices that still have spare capacity.
#[derive(Debug, Default)]
pub struct Partition {
    signature: Signature,
    ranges: Vec<TableRange>,
    to_fill: Vec<usize>,
}

impl Partition {
    fn new(signature: Signature) -> Self {
        Self { signature, ranges: Vec::new(), to_fill: Vec::new() }
    }

    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Every range in this partition (live and reserved capacity alike).
    #[inline]
    pub fn ranges(&self) -> &[TableRange] {
        &self.ranges
    }

    /// Total live row count across every range.
    pub fn live_count(&self) -> usize {
        self.ranges.iter().map(TableRange::len).sum()
    }
}

/// Which partition a live (or reserved) row currently belongs to - the
/// indirection that lets `swap_remove`/`change_archetype` reshuffle rows
/// without disturbing entity identity held by callers.
#[derive(Debug, Clone, Copy)]
struct RowInfo {
    signature: Signature,
}

/// Owns every column and every partition for a world.
///
/// Columns are keyed by [`component::Id`] and type-erased behind
/// [`AnyColumn`] so structural operations can move row data between
/// partitions without knowing each component's concrete Rust type.
pub struct Table {
    columns: HashMap<component::Id, Box<dyn AnyColumn>>,
    by_type: HashMap<TypeId, component::Id>,
    partitions: HashMap<Signature, Partition>,
    /// Row-id -> owning partition signature, for rows currently allocated
    /// (live or reserved). Grown lazily as rows are handed out.
    rows: Vec<Option<RowInfo>>,
    /// Next row-id to hand out to any partition's range. Shared across every
    /// partition so two archetypes never carve out the same physical row -
    /// columns are one flat address space for the whole table, not
    /// per-partition.
    next_row: usize,
    /// Capacity given to a freshly created [`TableRange`]. [`DEFAULT_CAPACITY`]
    /// unless the owning world was built with a [`crate::WorldConfig`]
    /// overriding it.
    capacity: usize,
}

impl Default for Table {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table whose partitions grow new ranges of `capacity` rows at a
    /// time instead of [`DEFAULT_CAPACITY`].
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: HashMap::new(),
            by_type: HashMap::new(),
            partitions: HashMap::new(),
            rows: Vec::new(),
            next_row: 0,
            capacity,
        }
    }

    /// Install a column for a freshly registered component type. A no-op if
    /// the id already has a column (registration is idempotent upstream).
    pub fn register_component<C: Component>(&mut self, id: component::Id, info: Info) {
        self.by_type.entry(TypeId::of::<C>()).or_insert(id);
        self.columns.entry(id).or_insert_with(|| Box::new(Column::<C>::new(info)));
    }

    pub fn column<C: Component>(&self, id: component::Id) -> Option<&Column<C>> {
        self.columns.get(&id)?.as_any().downcast_ref()
    }

    pub fn column_mut<C: Component>(&mut self, id: component::Id) -> Option<&mut Column<C>> {
        self.columns.get_mut(&id)?.as_any_mut().downcast_mut()
    }

    pub fn write_component<C: Component>(&mut self, row: usize, value: C) {
        let Some(&id) = self.by_type.get(&TypeId::of::<C>()) else { return };
        if let Some(col) = self.columns.get_mut(&id).and_then(|c| c.as_any_mut().downcast_mut::<Column<C>>()) {
            col.set(row, value);
        }
    }

    /// Every partition currently known, keyed by signature.
    pub fn partitions(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.values()
    }

    pub fn partition(&self, signature: &Signature) -> Option<&Partition> {
        self.partitions.get(signature)
    }

    /// Idempotently create an empty partition for `signature`, seeded with
    /// one empty range of [`DEFAULT_CAPACITY`].
    pub fn create_partition(&mut self, signature: Signature) -> &mut Partition {
        if !self.partitions.contains_key(&signature) {
            let start = self.next_row;
            self.next_row += self.capacity;
            let mut p = Partition::new(signature.clone());
            p.ranges.push(TableRange::new(start, self.capacity));
            p.to_fill.push(0);
            self.partitions.insert(signature.clone(), p);
            log::debug!("created partition for signature with {} components, starting at row {start}", signature.ids().count());
        }
        self.partitions.get_mut(&signature).unwrap()
    }

    fn ensure_row_capacity(&mut self, row: usize) {
        if row >= self.rows.len() {
            self.rows.resize(row + 1, None);
        }
    }

    /// Add one row to the partition for `signature`, picking the rightmost
    /// to-fill range and advancing its live end. Allocates a new range of
    /// [`DEFAULT_CAPACITY`] when every existing range is full.
    pub fn add_to_partition(&mut self, signature: &Signature) -> usize {
        self.create_partition(signature.clone());

        let range_idx = loop {
            let partition = self.partitions.get_mut(signature).unwrap();
            match partition.to_fill.last().copied() {
                Some(idx) if partition.ranges[idx].has_space() => break idx,
                Some(_) => {
                    // Fully consumed: drop from to_fill and try the next one.
                    partition.to_fill.pop();
                }
                None => {
                    let start = self.next_row;
                    self.next_row += self.capacity;
                    let partition = self.partitions.get_mut(signature).unwrap();
                    partition.ranges.push(TableRange::new(start, self.capacity));
                    partition.to_fill.push(partition.ranges.len() - 1);
                }
            }
        };

        let partition = self.partitions.get_mut(signature).unwrap();
        let range = &mut partition.ranges[range_idx];
        let row = if range.is_empty() { range.start } else { range.end + 1 };
        range.end = row;
        if !range.has_space() {
            partition.to_fill.retain(|&i| i != range_idx);
        }

        for col in self.columns.values_mut() {
            col.prealloc_range(row, row);
        }
        self.ensure_row_capacity(row);
        self.rows[row] = Some(RowInfo { signature: signature.clone() });
        row
    }

    /// Allocate `n` contiguous-where-possible rows for `signature`,
    /// consuming to-fill space first and appending fresh ranges for the
    /// remainder. Returns the sub-ranges actually written, in allocation
    /// order (there may be more than one if to-fill was partially used).
    pub fn allocate_range(&mut self, n: usize, signature: &Signature) -> Vec<Range<usize>> {
        if n == 0 {
            return Vec::new();
        }
        self.create_partition(signature.clone());
        let mut written = Vec::new();
        let mut remaining = n;

        while remaining > 0 {
            enum Slot {
                Existing(usize),
                NeedsNew,
            }
            let slot = {
                let partition = self.partitions.get_mut(signature).unwrap();
                match partition.to_fill.last().copied() {
                    Some(idx) if partition.ranges[idx].has_space() => Slot::Existing(idx),
                    Some(_) => {
                        partition.to_fill.pop();
                        continue;
                    }
                    None => Slot::NeedsNew,
                }
            };
            let range_idx = match slot {
                Slot::Existing(idx) => idx,
                Slot::NeedsNew => {
                    let capacity = remaining.max(self.capacity);
                    let start = self.next_row;
                    self.next_row += capacity;
                    let partition = self.partitions.get_mut(signature).unwrap();
                    partition.ranges.push(TableRange::new(start, capacity));
                    partition.to_fill.push(partition.ranges.len() - 1);
                    partition.ranges.len() - 1
                }
            };

            let partition = self.partitions.get_mut(signature).unwrap();
            let range = &mut partition.ranges[range_idx];
            let take = remaining.min(range.capacity - range.len());
            let start = if range.is_empty() { range.start } else { range.end + 1 };
            range.end = start + take - 1;
            if !range.has_space() {
                partition.to_fill.retain(|&i| i != range_idx);
            }

            for col in self.columns.values_mut() {
                col.prealloc_range(start, start + take - 1);
            }
            self.ensure_row_capacity(start + take - 1);
            for row in start..start + take {
                self.rows[row] = Some(RowInfo { signature: signature.clone() });
            }

            written.push(start..start + take);
            remaining -= take;
        }

        written
    }

    /// Signature the given (live) row currently belongs to.
    pub fn signature_of(&self, row: usize) -> Option<Signature> {
        self.rows.get(row).cloned().flatten().map(|r| r.signature)
    }

    /// Remove `row` from its partition by swapping the last live row of the
    /// same partition into its place, then shrinking that range by one.
    /// Returns the row-id whose contents moved into `row`'s old slot, if
    /// any row other than `row` itself had to move.
    pub fn swap_remove(&mut self, row: usize) -> Option<usize> {
        let signature = self.signature_of(row)?;
        let partition = self.partitions.get_mut(&signature)?;

        let range_idx = partition.ranges.iter().position(|r| r.live().contains(&row))?;
        let last_row = partition.ranges[range_idx].end;

        let moved = if row != last_row {
            for col in self.columns.values_mut() {
                col.move_row(last_row, row);
            }
            self.rows[row] = self.rows[last_row];
            Some(last_row)
        } else {
            for col in self.columns.values_mut() {
                col.remove(row);
            }
            None
        };

        self.rows[last_row] = None;
        let range = &mut partition.ranges[range_idx];
        let was_full = !range.has_space();
        range.end = range.end.wrapping_sub(1);
        if was_full && range.has_space() && !partition.to_fill.contains(&range_idx) {
            partition.to_fill.push(range_idx);
        }

        moved
    }

    /// Move `row` from `old_sig` to `new_sig`, preserving component values
    /// for bits present in both signatures. Returns `(new_row, relocated)`:
    /// `new_row` may differ from `row` since the new value lives in a
    /// different partition, and `relocated` is the row-id (if any) whose
    /// contents got swapped into `row`'s old slot when the source partition
    /// was compacted - callers that track row ownership externally (e.g. a
    /// stable entity-id indirection layer) must update that row's owner to
    /// point at `row`.
    ///
    /// Columns for bits only in `old_sig` are left untouched in place - the
    /// data is simply no longer reachable through any partition listing
    /// that bit - and columns for bits only in `new_sig` are left for the
    /// caller to populate.
    pub fn change_archetype(&mut self, row: usize, old_sig: &Signature, new_sig: &Signature) -> (usize, Option<usize>) {
        if old_sig == new_sig {
            return (row, None);
        }

        let shared = old_sig.intersection(new_sig);
        let new_row = self.add_to_partition(new_sig);

        for id in shared.ids() {
            if let Some(col) = self.columns.get_mut(&id) {
                col.move_row(row, new_row);
            }
        }
        // Columns only in old_sig: their value at `row` is abandoned, dead
        // until the swap below overwrites it.
        for id in old_sig.difference(new_sig).ids() {
            if let Some(col) = self.columns.get_mut(&id) {
                col.remove(row);
            }
        }

        let relocated = self.swap_remove(row);
        (new_row, relocated)
    }
}
