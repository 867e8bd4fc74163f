//! Shared, thread-safe ownership of a [`World`] for the dispatcher.
//!
//! The rest of the crate (`create_entity`, `query`, ...) operates on a
//! plain `&mut World` - fine for a single embedding thread. The dispatcher
//! runs each system as its own OS thread (§5), so something has to own the
//! world across threads and let every system hold a non-owning back
//! reference to it without a cycle. [`WorldHandle`] is that something: an
//! `Arc<Mutex<World>>` with a [`WeakWorld`] counterpart, mirroring how
//! `Entity`/`Column`/`System` are all specified to carry a weak world
//! reference rather than an owning one (§9 design notes).

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::world::World;

/// A cheaply-cloneable, thread-shared owner of a [`World`].
///
/// Cloning a `WorldHandle` clones the `Arc`, not the world; every clone
/// refers to the same simulation. Structural mutation (`create_entity`,
/// `attach`, ...) and system execution both go through [`with`](Self::with),
/// which serializes access behind the inner mutex - the discipline §5 asks
/// for ("structural change APIs must not run concurrently with dispatch")
/// is enforced by simply not handing out two mutable borrows at once.
#[derive(Clone)]
pub struct WorldHandle(Arc<Mutex<World>>);

impl WorldHandle {
    /// Take ownership of `world`, making it shareable across system threads.
    pub fn new(world: World) -> Self {
        Self(Arc::new(Mutex::new(world)))
    }

    /// Run `f` with exclusive access to the world.
    ///
    /// # Panics
    ///
    /// Panics if the mutex was poisoned by a panic in another holder - the
    /// same failure mode as `std::sync::Mutex` generally, and consistent
    /// with the rest of the crate not trying to recover from a poisoned
    /// world.
    pub fn with<R>(&self, f: impl FnOnce(&mut World) -> R) -> R {
        let mut guard: MutexGuard<'_, World> = self.0.lock().unwrap();
        f(&mut guard)
    }

    /// A non-owning reference, suitable for a system or entity to hold
    /// without keeping the world alive on its own.
    pub fn downgrade(&self) -> WeakWorld {
        WeakWorld(Arc::downgrade(&self.0))
    }
}

/// A non-owning reference to a [`WorldHandle`]'s world.
///
/// Every system carries one of these, set the first time it is subscribed
/// or becomes a listener of an already-subscribed system (§9).
#[derive(Clone, Default)]
pub struct WeakWorld(Weak<Mutex<World>>);

impl WeakWorld {
    /// A reference to nothing - the state of a system that has never been
    /// subscribed nor wired into a dataflow edge.
    pub fn none() -> Self {
        Self(Weak::new())
    }

    /// Recover a strong handle, if the world is still alive.
    pub fn upgrade(&self) -> Option<WorldHandle> {
        self.0.upgrade().map(WorldHandle)
    }

    /// Whether this reference currently points at nothing.
    pub fn is_none(&self) -> bool {
        self.0.strong_count() == 0 && self.0.upgrade().is_none()
    }
}
