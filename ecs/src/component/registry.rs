use std::{
    any::TypeId,
    sync::RwLock,
    sync::atomic::{AtomicU32, Ordering},
};

use dashmap::DashMap;

use crate::component::{Component, Id, Info, MAX_COMPONENTS};
use crate::error::{EcsError, EcsResult};

/// A thread-safe component registry, owned by a single world. Responsible
/// for assigning each registered component type its dense bit [`Id`].
///
/// The registry uses lock-free reads for TypeId→Id lookups via `DashMap`,
/// making the common read path highly performant. Component registration
/// uses minimal locking - only a single shard of the DashMap and a write
/// lock for the component info vector.
///
/// Why thread-safe?
/// - Most things in the ECS are not thread-safe, but different worlds may be created in their own
///   threads, and all worlds need to agree on component IDs.
///
/// The bit index space is per-registry, not a process-wide global: two
/// worlds may assign the same Rust type different ids.
pub struct Registry {
    /// Map from TypeId to component Id. Lock-free reads via sharded concurrent hashmap.
    type_map: DashMap<TypeId, Id>,

    /// List of registered component entries. Protected by RwLock for rare writes.
    components: RwLock<Vec<Option<Info>>>,

    /// Next available component identifier.
    next_id: AtomicU32,

    /// Ceiling on distinct component types this registry will hand out,
    /// always `<= MAX_COMPONENTS` (a world may tighten it via
    /// [`crate::WorldConfig::max_components`], but never loosen it beyond
    /// what `Signature`'s 128 bits can address).
    max: usize,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a new component registry with the default ceiling of
    /// [`MAX_COMPONENTS`].
    #[inline]
    pub fn new() -> Self {
        Self::with_max(MAX_COMPONENTS)
    }

    /// Create a registry that refuses registration past `max` distinct
    /// types, clamped to [`MAX_COMPONENTS`].
    #[inline]
    pub fn with_max(max: usize) -> Self {
        Self {
            type_map: DashMap::new(),
            components: RwLock::new(Vec::new()),
            next_id: AtomicU32::new(0),
            max: max.min(MAX_COMPONENTS),
        }
    }

    /// Register a new component type and get its unique identifier.
    ///
    /// This method is thread-safe and can be called concurrently. If the component type is
    /// already registered, returns the existing ID. Otherwise, allocates a new ID and stores
    /// the component info, failing with [`EcsError::CapacityExceeded`] once
    /// [`MAX_COMPONENTS`] distinct types are already registered.
    pub fn register<C: Component>(&self) -> EcsResult<Id> {
        let type_id = TypeId::of::<C>();

        // Fast path: check if already registered (lock-free read)
        if let Some(id) = self.type_map.get(&type_id) {
            return Ok(*id);
        }

        if self.len() >= self.max {
            return Err(EcsError::CapacityExceeded { max: self.max });
        }

        // Slow path: need to register. Use the entry API to avoid a race
        // where two threads both miss the fast-path cache.
        let mut over_capacity = false;
        let id = *self
            .type_map
            .entry(type_id)
            .or_insert_with(|| {
                let id_value = self.next_id.fetch_add(1, Ordering::Relaxed);
                if id_value as usize >= self.max {
                    over_capacity = true;
                    return Id::new(id_value);
                }

                let comp_id = Id::new(id_value);
                let mut components = self.components.write().unwrap();
                let index = id_value as usize;
                if index >= components.len() {
                    components.resize(index + 1, None);
                }
                components[index] = Some(Info::new::<C>(comp_id));
                comp_id
            })
            .value();

        if over_capacity {
            self.type_map.remove(&type_id);
            return Err(EcsError::CapacityExceeded { max: self.max });
        }

        Ok(id)
    }

    /// Get the component ID for a provided type `C`, if registered.
    ///
    /// Performance:
    /// - Uses lock-free read to get ID from TypeId.
    #[inline]
    pub fn get<C: Component>(&self) -> Option<Id> {
        let type_id = TypeId::of::<C>();
        self.type_map.get(&type_id).map(|entry| *entry.value())
    }

    /// Get the component info for a provided type `C`, if registered.
    #[inline]
    pub fn get_info<C: Component>(&self) -> Option<Info> {
        let id = self.get::<C>()?;
        self.get_info_by_id(id)
    }

    /// Get component info by ID.
    #[inline]
    pub fn get_info_by_id(&self, id: Id) -> Option<Info> {
        let components = self.components.read().unwrap();
        components.get(id.index()).and_then(|i| *i)
    }

    /// Number of distinct component types registered so far.
    pub fn len(&self) -> usize {
        self.next_id.load(Ordering::Relaxed) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
