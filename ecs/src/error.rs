//! Error types surfaced across the ECS API boundary.

use thiserror::Error;

use crate::entity::Entity;

/// Every structured failure the engine can report.
///
/// Structural operations (`attach`, `detach`, `remove_entity`, ...) never
/// partially apply: on error the world is left exactly as it was before the
/// call.
#[derive(Debug, Error)]
pub enum EcsError {
    /// `register_component` was called for the 129th distinct component type.
    #[error("component capacity exceeded: at most {max} component types are supported")]
    CapacityExceeded {
        /// The configured ceiling (`MAX_COMPONENTS` unless overridden).
        max: usize,
    },

    /// A query or column lookup named a component type that was never
    /// registered on this world.
    #[error("unknown component")]
    UnknownComponent,

    /// The entity has already been removed (or was never allocated).
    #[error("entity {0:?} is dead")]
    DeadEntity(Entity),

    /// A `FragmentVector`/column access fell outside every recorded block.
    #[error("index {index} is out of range")]
    OutOfRange {
        /// The row-id or range index that had no backing storage.
        index: usize,
    },

    /// `listen_to` would have introduced a cycle in the dataflow graph.
    #[error("listen_to would introduce a cycle")]
    CycleDetected,

    /// `run_system` was called on a system with no world reference, i.e. one
    /// that has never been subscribed nor wired as a listener.
    #[error("system is not subscribed to a world")]
    NotSubscribed,

    /// A system's `run` callback returned an error; the system that raised
    /// it has been stopped, other systems are unaffected.
    #[error("system run failed: {0}")]
    SystemRunFailed(String),
}

/// Convenience alias used throughout the crate.
pub type EcsResult<T> = Result<T, EcsError>;
