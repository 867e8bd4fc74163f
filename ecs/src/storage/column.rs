//! SoA component storage over a [`FragmentVector`].

use std::any::Any;
use std::ops::RangeInclusive;

use crate::component::{Component, Info};
use crate::storage::fragment_vector::FragmentVector;
use crate::storage::lock::HierarchicalLock;

/// Type-erased operations every column supports, regardless of its
/// component type. A `Table` holds its columns behind this trait object so
/// that structural operations (migration, swap-remove) can move row data
/// around without knowing each component's concrete Rust type.
pub trait AnyColumn: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Metadata for the component type this column stores.
    fn info(&self) -> Info;

    /// Reserve storage for `[start, end]` (inclusive rows).
    fn prealloc_range(&mut self, start: usize, end: usize) -> RangeInclusive<usize>;

    /// Move the value at `from` to `to`, dropping whatever value previously
    /// occupied `to`. Leaves `from` unset. A no-op if `from` holds no value.
    fn move_row(&mut self, from: usize, to: usize);

    /// Drop the value at `row`, if any, leaving the row unset.
    fn remove(&mut self, row: usize);

    /// The hierarchical lock guarding this column's sub-fields.
    fn lock(&self) -> &HierarchicalLock;
}

/// One registered component type's storage: a dense, field-wise array
/// indexed by row-id, backed by a [`FragmentVector`].
///
/// Row-level assignment (`set`) replaces the whole value atomically;
/// iteration is block-wise (see [`FragmentVector::get_iterator_range`]) so
/// query inner loops can walk a block's values directly.
pub struct Column<T: Component> {
    info: Info,
    data: FragmentVector<T>,
    lock: HierarchicalLock,
}

impl<T: Component> Column<T> {
    pub fn new(info: Info) -> Self {
        Self {
            info,
            data: FragmentVector::new(),
            lock: HierarchicalLock::leaf(),
        }
    }

    /// Construct a column whose sub-field lock tree is described by
    /// `field_lock` instead of the default single-leaf lock. Used for
    /// components whose fields are mutated independently by different
    /// systems.
    pub fn with_field_lock(info: Info, field_lock: HierarchicalLock) -> Self {
        Self {
            info,
            data: FragmentVector::new(),
            lock: field_lock,
        }
    }

    pub fn get(&self, row: usize) -> Option<&T> {
        self.data.get(row)
    }

    pub fn get_mut(&mut self, row: usize) -> Option<&mut T> {
        self.data.get_mut(row)
    }

    pub fn set(&mut self, row: usize, value: T) {
        self.data.set(row, value);
    }
}

impl<T: Component> AnyColumn for Column<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn info(&self) -> Info {
        self.info
    }

    fn prealloc_range(&mut self, start: usize, end: usize) -> RangeInclusive<usize> {
        self.data.prealloc_range(start, end)
    }

    fn move_row(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        if let Some(v) = self.data.delete(from) {
            self.data.set(to, v);
        }
    }

    fn remove(&mut self, row: usize) {
        self.data.delete(row);
    }

    fn lock(&self) -> &HierarchicalLock {
        &self.lock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Clone, Copy)]
    struct Position {
        x: f64,
        y: f64,
    }
    impl Component for Position {}

    fn info() -> Info {
        Info::new::<Position>(crate::component::Id::new(0))
    }

    #[test]
    fn set_then_get_round_trips() {
        // Given
        let mut col = Column::<Position>::new(info());

        // When
        col.set(3, Position { x: 1.0, y: 2.0 });

        // Then
        assert_eq!(col.get(3), Some(&Position { x: 1.0, y: 2.0 }));
    }

    #[test]
    fn move_row_transfers_and_clears_source() {
        // Given
        let mut col = Column::<Position>::new(info());
        col.set(0, Position { x: 1.0, y: 1.0 });

        // When
        AnyColumn::move_row(&mut col, 0, 5);

        // Then
        assert_eq!(col.get(0), None);
        assert_eq!(col.get(5), Some(&Position { x: 1.0, y: 1.0 }));
    }

    #[test]
    fn remove_clears_the_row() {
        // Given
        let mut col = Column::<Position>::new(info());
        col.set(0, Position { x: 1.0, y: 1.0 });

        // When
        AnyColumn::remove(&mut col, 0);

        // Then
        assert_eq!(col.get(0), None);
    }

    #[test]
    fn as_any_downcasts_back_to_the_concrete_column() {
        // Given
        let col: Box<dyn AnyColumn> = Box::new(Column::<Position>::new(info()));

        // Then
        assert!(col.as_any().downcast_ref::<Column<Position>>().is_some());
    }
}
