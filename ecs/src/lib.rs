//! A data-oriented entity-component-system runtime.
//!
//! Components live in column-major, per-archetype storage
//! ([`storage::Table`]); entities are identified by stable, generation-
//! checked handles ([`entity::Entity`]); queries compile a boolean component
//! expression down to a set of matching row ranges
//! ([`query::Query`]); and a reactive dispatcher runs systems as their own
//! OS threads, feeding each one the result of its query or a value forwarded
//! from an upstream system ([`system::Dispatcher`]).
//!
//! [`world::World`] ties all of the above together behind a single
//! create/attach/detach/query surface; [`system::WorldHandle`] wraps a
//! `World` for sharing across a dispatcher's system threads.

pub mod component;
pub mod entity;
pub mod error;
pub mod query;
pub mod storage;
pub mod system;
pub mod world;

pub use component::{Component, MAX_COMPONENTS};
pub use entity::Entity;
pub use error::{EcsError, EcsResult};
pub use query::{Expr, Query};
pub use system::{Dispatcher, Message, Payload, System, SystemId, WeakWorld, WorldHandle};
pub use world::{World, WorldConfig};

pub use rusty_ecs_macros::Component as ComponentDerive;
