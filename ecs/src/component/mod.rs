//! Component management for the ECS.
//!
//! This module provides the infrastructure for registering, storing, and managing component types
//! in the Entity Component System. Components are the data containers that can be attached to
//! entities to give them properties and behaviors.
//!
//! ## Architecture
//!
//! - [`Component`]: The trait every component type implements (via `#[derive(Component)]`).
//! - [`Id`]: A dense bit index assigned to each registered component type.
//! - [`Signature`]: The 128-bit archetype bitset a set of component ids compiles to.
//! - [`Registry`]: Thread-safe registration and lookup of component types, capped at
//!   [`MAX_COMPONENTS`].
//! - [`Info`]: Metadata about a registered component type.
//!
//! ## Thread Safety
//!
//! The [`Registry`] is designed for high-performance concurrent access:
//! - Lock-free reads for component ID lookups using `DashMap`
//! - Minimal locking for registration (only when a new type is first registered)
//! - Component registration is idempotent and thread-safe
//!
//! ## Usage
//!
//! ```ignore
//! use rusty_ecs::component::{Component, Registry};
//!
//! #[derive(Component)]
//! struct Position { x: f32, y: f32 }
//!
//! let registry = Registry::new();
//! let pos_id = registry.register::<Position>().unwrap();
//! ```

use std::any::TypeId;

mod bundle;
mod registry;
mod signature;

pub use bundle::Bundle;
pub use registry::Registry;
pub use signature::Signature;

/// The ceiling on distinct component types a single world may register.
/// `Signature` is a 128-bit value, one bit per component, so this is fixed.
pub const MAX_COMPONENTS: usize = 128;

/// A component identifier: a dense bit index in `[0, MAX_COMPONENTS)`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    /// Construct a new component Id from a raw u32 value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this component if it were to live in indexable storage (e.g. Vec)
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for Id {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<usize> for Id {
    #[inline]
    fn from(value: usize) -> Self {
        Self::new(value as u32)
    }
}

/// A trait representing a component in the ECS (Entity Component System).
///
/// Implemented via `#[derive(Component)]`; at present this only sets the
/// required trait bounds for a type to be stored in a [`crate::storage::Column`].
pub trait Component: 'static + Sized + Send + Sync {}

/// Metadata recorded for every registered component type.
#[derive(Debug, Clone, Copy)]
pub struct Info {
    id: Id,
    type_id: TypeId,
    name: &'static str,
}

impl Info {
    pub(crate) fn new<C: Component>(id: Id) -> Self {
        Self {
            id,
            type_id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
        }
    }

    /// The bit index assigned to this component type.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// The `TypeId` of the registered Rust type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The type's fully-qualified name, for diagnostics.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}
