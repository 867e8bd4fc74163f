//! Bundles: ergonomic multi-component values passed to `create_entity`/`attach`.

use crate::component::{Component, Registry, Signature};
use crate::error::EcsResult;
use crate::storage::Table;

/// A set of component values that can be registered, signed, and written
/// into a table row as a unit.
///
/// Implemented for `()`, single components, and tuples of components up to
/// arity 8 (the common case for entity archetypes). Structural operations
/// that take a bundle either write every field or none: `write` is only
/// called once the target row has already been reserved in a partition with
/// the matching signature.
pub trait Bundle: Send + 'static {
    /// Register every component type in this bundle and return the
    /// resulting archetype signature.
    fn register(registry: &Registry) -> EcsResult<Signature>;

    /// Ensure every bundled type has a backing column in `table`, creating
    /// it from `registry`'s metadata if this is the first time the type has
    /// ever been written.
    fn ensure_columns(registry: &Registry, table: &mut Table);

    /// Write this bundle's values into `table` at `row`. The row's columns
    /// for every bundled type must already exist (i.e. `ensure_columns` has
    /// run).
    fn write(self, table: &mut Table, row: usize);
}

impl Bundle for () {
    fn register(_registry: &Registry) -> EcsResult<Signature> {
        Ok(Signature::empty())
    }

    fn ensure_columns(_registry: &Registry, _table: &mut Table) {}

    fn write(self, _table: &mut Table, _row: usize) {}
}

impl<C: Component> Bundle for C {
    fn register(registry: &Registry) -> EcsResult<Signature> {
        Ok(Signature::of(registry.register::<C>()?))
    }

    fn ensure_columns(registry: &Registry, table: &mut Table) {
        if let Some(info) = registry.get_info::<C>() {
            table.register_component::<C>(info.id(), info);
        }
    }

    fn write(self, table: &mut Table, row: usize) {
        table.write_component(row, self);
    }
}

macro_rules! impl_bundle_tuple {
    ($($name:ident),+) => {
        impl<$($name: Component),+> Bundle for ($($name,)+) {
            fn register(registry: &Registry) -> EcsResult<Signature> {
                let mut sig = Signature::empty();
                $(
                    sig = sig.union(&Signature::of(registry.register::<$name>()?));
                )+
                Ok(sig)
            }

            fn ensure_columns(registry: &Registry, table: &mut Table) {
                $(
                    <$name as Bundle>::ensure_columns(registry, table);
                )+
            }

            #[allow(non_snake_case)]
            fn write(self, table: &mut Table, row: usize) {
                let ($($name,)+) = self;
                $(
                    table.write_component(row, $name);
                )+
            }
        }
    };
}

impl_bundle_tuple!(A, B);
impl_bundle_tuple!(A, B, C);
impl_bundle_tuple!(A, B, C, D);
impl_bundle_tuple!(A, B, C, D, E);
impl_bundle_tuple!(A, B, C, D, E, F);
impl_bundle_tuple!(A, B, C, D, E, F, G);
impl_bundle_tuple!(A, B, C, D, E, F, G, H);
