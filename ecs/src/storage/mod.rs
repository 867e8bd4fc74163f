//! Column-major, partitioned row storage.
//!
//! Each registered component type gets a [`Column`] - a struct-of-arrays
//! view backed by a [`FragmentVector`] - and every column lives in a single
//! [`Table`] shared by the whole world. The table groups live rows into
//! [`Partition`]s keyed by archetype [`Signature`], each a list of
//! [`TableRange`]s the query engine resolves against.

pub mod column;
pub mod fragment_vector;
pub mod lock;
pub mod table;

pub use column::{AnyColumn, Column};
pub use fragment_vector::FragmentVector;
pub use lock::HierarchicalLock;
pub use table::{Partition, Table, TableRange, DEFAULT_CAPACITY};
