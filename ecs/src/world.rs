//! The world: ties the component registry, row storage, and entity identity
//! layer together behind the public create/attach/detach/query surface.
//!
//! Table rows are an internal addressing detail - `swap_remove` and
//! `change_archetype` are free to relocate a row's contents to compact a
//! partition. To keep an [`Entity`] a stable handle across those moves, the
//! world holds an indirection layer (`locations`, `row_owner`) mapping
//! entity identity to its current row and back, the same shape as the
//! `Location`-style indirection a table implementation reaches for when row
//! and identity must be allowed to diverge.

use crate::component::{self, Bundle, Component, Registry, Signature, MAX_COMPONENTS};
use crate::entity::{self, Entity, EntityRange, Generation};
use crate::error::{EcsError, EcsResult};
use crate::query::{Expr, Query};
use crate::storage::{Column, Table, DEFAULT_CAPACITY};

/// Plain-old-data construction knobs for a [`World`].
///
/// The engine has no on-disk state (there is nothing to load from a file);
/// this is just the set of defaults §3/§4.3 name, gathered so callers don't
/// have to thread them through every constructor individually.
#[derive(Debug, Clone, Copy)]
pub struct WorldConfig {
    /// Row capacity a freshly created [`crate::storage::TableRange`] is
    /// given. Defaults to [`DEFAULT_CAPACITY`] (4096).
    pub partition_capacity: usize,
    /// Bound used for a system's input channel when the dispatcher creates
    /// one against this world. Defaults to 64.
    pub channel_bound: usize,
    /// Ceiling on distinct component types this world will register,
    /// clamped to [`MAX_COMPONENTS`]. Defaults to [`MAX_COMPONENTS`].
    pub max_components: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            partition_capacity: DEFAULT_CAPACITY,
            channel_bound: 64,
            max_components: MAX_COMPONENTS,
        }
    }
}

/// Owns every component column, the partitioned row store, and entity
/// identity for one simulation.
pub struct World {
    config: WorldConfig,
    components: Registry,
    table: Table,
    allocator: entity::Allocator,
    /// Entity index -> current row, `None` once the entity is dead.
    locations: Vec<Option<usize>>,
    /// Row -> owning entity index, the reverse of `locations`.
    row_owner: Vec<Option<usize>>,
    /// Entity index -> the generation that is currently alive at that index.
    slots: Vec<Option<Generation>>,
    parent: Vec<Option<Entity>>,
    children: Vec<Vec<Entity>>,
}

impl Default for World {
    fn default() -> Self {
        Self::with_config(WorldConfig::default())
    }
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a world whose partition capacity, default system channel
    /// bound, and component ceiling follow `config` instead of the defaults.
    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            components: Registry::with_max(config.max_components),
            table: Table::with_capacity(config.partition_capacity),
            config,
            allocator: entity::Allocator::new(),
            locations: Vec::new(),
            row_owner: Vec::new(),
            slots: Vec::new(),
            parent: Vec::new(),
            children: Vec::new(),
        }
    }

    /// The configuration this world was built with.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Register a component type, assigning it a bit index if this is the
    /// first time it has been seen on this world.
    pub fn register_component<C: Component>(&mut self) -> EcsResult<component::Id> {
        let id = self.components.register::<C>()?;
        log::debug!("registered component {} as {:?}", std::any::type_name::<C>(), id);
        Ok(id)
    }

    fn ensure_entity_capacity(&mut self, idx: usize) {
        if idx >= self.locations.len() {
            self.locations.resize(idx + 1, None);
            self.slots.resize(idx + 1, None);
            self.parent.resize(idx + 1, None);
            self.children.resize_with(idx + 1, Vec::new);
        }
    }

    fn ensure_row_capacity(&mut self, row: usize) {
        if row >= self.row_owner.len() {
            self.row_owner.resize(row + 1, None);
        }
    }

    /// Record that `entity` is freshly alive at `row`.
    fn link(&mut self, entity: Entity, row: usize) {
        let idx = entity.index();
        self.ensure_entity_capacity(idx);
        self.ensure_row_capacity(row);
        self.locations[idx] = Some(row);
        self.row_owner[row] = Some(idx);
        self.slots[idx] = Some(entity.generation());
    }

    /// The row `entity` currently occupies, or `DEAD_ENTITY` if it has been
    /// removed (or its generation has been superseded).
    fn ensure_alive(&self, entity: Entity) -> EcsResult<usize> {
        let idx = entity.index();
        match self.slots.get(idx).copied().flatten() {
            Some(gen) if gen == entity.generation() => {
                self.locations[idx].ok_or(EcsError::DeadEntity(entity))
            }
            _ => Err(EcsError::DeadEntity(entity)),
        }
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.ensure_alive(entity).is_ok()
    }

    /// Absorb the bookkeeping fallout of a table-level row relocation: if
    /// `relocated` names the row whose contents just got swapped into
    /// `row`'s old slot, re-point that row's owner at `row`.
    fn absorb_relocation(&mut self, row: usize, relocated: Option<usize>) {
        if let Some(moved_row) = relocated {
            if let Some(owner) = self.row_owner.get(moved_row).copied().flatten() {
                self.locations[owner] = Some(row);
                self.row_owner[row] = Some(owner);
            }
            if moved_row < self.row_owner.len() {
                self.row_owner[moved_row] = None;
            }
        }
    }

    /// Move `entity` (currently at `row`) from `old_sig` to `new_sig`,
    /// keeping the identity layer consistent, and return the row it now
    /// occupies.
    fn relocate(&mut self, entity: Entity, row: usize, old_sig: Signature, new_sig: Signature) -> usize {
        log::trace!("migrating entity {:?} archetype at row {row}", entity);
        let (new_row, relocated) = self.table.change_archetype(row, &old_sig, &new_sig);
        self.absorb_relocation(row, relocated);
        self.ensure_row_capacity(new_row);
        self.locations[entity.index()] = Some(new_row);
        self.row_owner[new_row] = Some(entity.index());
        new_row
    }

    /// Create an entity with every field of `bundle` written immediately.
    pub fn create_entity<B: Bundle>(&mut self, bundle: B) -> EcsResult<Entity> {
        let sig = B::register(&self.components)?;
        B::ensure_columns(&self.components, &mut self.table);
        let row = self.table.add_to_partition(&sig);
        bundle.write(&mut self.table, row);
        let entity = self.allocator.alloc();
        self.link(entity, row);
        log::trace!("created entity {:?} at row {row}", entity);
        Ok(entity)
    }

    /// Create an entity with `B`'s columns present but left unwritten -
    /// the fast path for reusing a signature without supplying values yet.
    /// Reads of an unwritten field return `None` until a later `attach`
    /// (or direct column write) populates it.
    pub fn create_entity_uninit<B: Bundle>(&mut self) -> EcsResult<Entity> {
        let sig = B::register(&self.components)?;
        B::ensure_columns(&self.components, &mut self.table);
        let row = self.table.add_to_partition(&sig);
        let entity = self.allocator.alloc();
        self.link(entity, row);
        Ok(entity)
    }

    /// Bulk-spawn `n` entities all carrying a clone of `value`, without
    /// linking `n` [`Entity`] records into the world's identity tables up
    /// front. Every row's id is still drawn from this world's single
    /// [`entity::Allocator`] sequence (`alloc_many`, the same path
    /// `create_entity` ultimately bottoms out on), so a bulk-spawned id can
    /// never collide with one handed out by `create_entity` - before or
    /// after this call - nor alias the row's own physical row-id. What is
    /// actually deferred is the more expensive step: growing
    /// `locations`/`slots` and wiring a parent edge, which happens lazily in
    /// [`get_entity`](Self::get_entity).
    pub fn request_entity<B: Bundle + Clone>(
        &mut self,
        value: B,
        n: usize,
        parent: Option<Entity>,
    ) -> EcsResult<EntityRange> {
        let sig = B::register(&self.components)?;
        B::ensure_columns(&self.components, &mut self.table);
        let spans = self.table.allocate_range(n, &sig);

        for span in &spans {
            for row in span.clone() {
                value.clone().write(&mut self.table, row);
            }
        }

        let entities = self.allocator.alloc_many(n);
        Ok(EntityRange::new(spans, sig, parent, entities))
    }

    /// Lazily link the `k`th row of `range` into this world's identity
    /// tables, returning its (already-allocated) [`Entity`] handle.
    ///
    /// The first call for a given row links it into this world's identity
    /// layer (and, if the range was spawned with a parent, wires the
    /// parent/child edge); later calls for the same row are idempotent.
    pub fn get_entity(&mut self, range: &mut EntityRange, k: usize) -> EcsResult<Entity> {
        let row = range.row_of(k).ok_or(EcsError::OutOfRange { index: k })?;
        let entity = range.get_entity(k).ok_or(EcsError::OutOfRange { index: k })?;
        let already_linked = self.locations.get(entity.index()).copied().flatten().is_some();
        if !already_linked {
            self.link(entity, row);
            if let Some(parent) = range.parent() {
                self.set_parent(entity, parent)?;
            }
        }
        Ok(entity)
    }

    /// Swap-remove `entity` from its partition, recursively removing its
    /// children first.
    pub fn remove_entity(&mut self, entity: Entity) -> EcsResult<()> {
        self.ensure_alive(entity)?;
        log::trace!("removing entity {:?}", entity);

        let kids = std::mem::take(&mut self.children[entity.index()]);
        for child in kids {
            let _ = self.remove_entity(child);
        }
        if let Some(parent) = self.parent[entity.index()].take() {
            if parent.index() < self.children.len() {
                self.children[parent.index()].retain(|&c| c != entity);
            }
        }

        // Children sharing entity's own partition may have relocated its
        // row while being removed above, so re-resolve it here.
        let row = self.locations[entity.index()].ok_or(EcsError::DeadEntity(entity))?;
        let relocated = self.table.swap_remove(row);
        match relocated {
            Some(moved_row) => self.absorb_relocation(row, Some(moved_row)),
            None => self.row_owner[row] = None,
        }

        self.locations[entity.index()] = None;
        self.slots[entity.index()] = None;
        self.allocator.free(entity);
        Ok(())
    }

    /// Attach every component in `bundle` to `entity`, migrating its
    /// archetype if any of them are new.
    pub fn attach<B: Bundle>(&mut self, entity: Entity, bundle: B) -> EcsResult<()> {
        let row = self.ensure_alive(entity)?;
        let old_sig = self.table.signature_of(row).unwrap_or_else(Signature::empty);
        let added = B::register(&self.components)?;
        B::ensure_columns(&self.components, &mut self.table);
        let new_sig = old_sig.union(&added);

        let target_row = self.relocate(entity, row, old_sig, new_sig);
        bundle.write(&mut self.table, target_row);
        Ok(())
    }

    /// Detach component `C` from `entity`, migrating its archetype. A no-op
    /// if `C` was never registered or `entity` doesn't carry it.
    pub fn detach<C: Component>(&mut self, entity: Entity) -> EcsResult<()> {
        let row = self.ensure_alive(entity)?;
        let Some(id) = self.components.get::<C>() else {
            return Ok(());
        };
        let old_sig = self.table.signature_of(row).unwrap_or_else(Signature::empty);
        if !old_sig.contains(id) {
            return Ok(());
        }
        let new_sig = old_sig.difference(&Signature::of(id));
        self.relocate(entity, row, old_sig, new_sig);
        Ok(())
    }

    /// Link `child` under `parent` in the entity forest. Does not affect
    /// archetype or storage.
    pub fn set_parent(&mut self, child: Entity, parent: Entity) -> EcsResult<()> {
        self.ensure_alive(child)?;
        self.ensure_alive(parent)?;
        if let Some(old_parent) = self.parent[child.index()].replace(parent) {
            self.children[old_parent.index()].retain(|&c| c != child);
        }
        self.children[parent.index()].push(child);
        Ok(())
    }

    pub fn parent_of(&self, entity: Entity) -> Option<Entity> {
        self.parent.get(entity.index()).copied().flatten()
    }

    pub fn children_of(&self, entity: Entity) -> &[Entity] {
        self.children.get(entity.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The column backing component `C`, if it has been registered.
    pub fn get_component<C: Component>(&self) -> EcsResult<&Column<C>> {
        let id = self.components.get::<C>().ok_or(EcsError::UnknownComponent)?;
        self.table.column::<C>(id).ok_or(EcsError::UnknownComponent)
    }

    /// Mutable access to the column backing component `C`, if registered.
    /// The column's own [`crate::storage::HierarchicalLock`] is what lets a
    /// system hold this across a tick without blocking a sibling system
    /// that only touches a disjoint sub-field.
    pub fn get_component_mut<C: Component>(&mut self) -> EcsResult<&mut Column<C>> {
        let id = self.components.get::<C>().ok_or(EcsError::UnknownComponent)?;
        self.table.column_mut::<C>(id).ok_or(EcsError::UnknownComponent)
    }

    pub fn query(&self, expr: Expr) -> Query {
        Query::new(expr)
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn components(&self) -> &Registry {
        &self.components
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position {
        x: f64,
        y: f64,
    }
    impl Component for Position {}

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity {
        dx: f64,
        dy: f64,
    }
    impl Component for Velocity {}

    #[test]
    fn create_then_remove_restores_entity_count() {
        let mut world = World::new();
        let e = world.create_entity(Position { x: 0.0, y: 0.0 }).unwrap();
        assert!(world.is_alive(e));

        world.remove_entity(e).unwrap();
        assert!(!world.is_alive(e));
    }

    #[test]
    fn swap_remove_preserves_other_entity_identity() {
        let mut world = World::new();
        let a = world.create_entity(Position { x: 1.0, y: 1.0 }).unwrap();
        let b = world.create_entity(Position { x: 2.0, y: 2.0 }).unwrap();
        let c = world.create_entity(Position { x: 3.0, y: 3.0 }).unwrap();

        world.remove_entity(b).unwrap();

        assert!(world.is_alive(a));
        assert!(!world.is_alive(b));
        assert!(world.is_alive(c));
        let col = world.get_component::<Position>().unwrap();
        let a_row = world.locations[a.index()].unwrap();
        let c_row = world.locations[c.index()].unwrap();
        assert_eq!(col.get(a_row), Some(&Position { x: 1.0, y: 1.0 }));
        assert_eq!(col.get(c_row), Some(&Position { x: 3.0, y: 3.0 }));
    }

    #[test]
    fn attach_then_query_includes_entity() {
        let mut world = World::new();
        let e = world.create_entity(Position { x: 0.0, y: 0.0 }).unwrap();

        let pos_id = world.register_component::<Position>().unwrap();
        let vel_id = world.register_component::<Velocity>().unwrap();
        let both = world.query(Expr::has(pos_id) & Expr::has(vel_id));
        assert!(both.resolve(&world.table).iter().all(|r| r.ranges.is_empty()));

        world.attach(e, Velocity { dx: 1.0, dy: 1.0 }).unwrap();
        let resolved = both.resolve(&world.table);
        let total: usize = resolved.iter().map(|r| r.ranges.iter().map(|rg| rg.len()).sum::<usize>()).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn attach_then_detach_restores_archetype() {
        let mut world = World::new();
        let e = world.create_entity(Position { x: 0.0, y: 0.0 }).unwrap();
        world.attach(e, Velocity { dx: 1.0, dy: 1.0 }).unwrap();
        world.detach::<Velocity>(e).unwrap();

        let vel_id = world.components.get::<Velocity>().unwrap();
        let row = world.locations[e.index()].unwrap();
        let sig = world.table.signature_of(row).unwrap();
        assert!(!sig.contains(vel_id));
    }

    #[test]
    fn bulk_request_sums_match_expected_total() {
        let mut world = World::new();
        let range = world.request_entity(Position { x: 5.0, y: 0.0 }, 10_000, None).unwrap();
        assert_eq!(range.len(), 10_000);

        let pos_id = world.components.get::<Position>().unwrap();
        let query = world.query(Expr::has(pos_id));
        let mut total = 0.0;
        let col = world.get_component::<Position>().unwrap();
        query.for_each_range(&world.table, |_, r| {
            for row in r.live() {
                total += col.get(row).map(|p| p.x).unwrap_or(0.0);
            }
        });
        assert_eq!(total, 50_000.0);
    }

    #[test]
    fn bulk_request_defers_entity_materialization_until_get_entity() {
        let mut world = World::new();
        let mut range = world.request_entity(Position { x: 0.0, y: 0.0 }, 5, None).unwrap();
        assert_eq!(range.init(), 0);

        // Nothing linked into the world yet: the row is live in the table
        // and its id was already allocated, but `locations`/`slots` have no
        // entry for it until `get_entity` is called.
        let e = world.get_entity(&mut range, 2).unwrap();
        assert!(world.is_alive(e));
        assert_eq!(range.init(), 1);

        // Idempotent on repeat materialization of the same offset.
        let e_again = world.get_entity(&mut range, 2).unwrap();
        assert_eq!(e, e_again);
    }

    #[test]
    fn bulk_request_wires_parent_on_first_materialization() {
        let mut world = World::new();
        let parent = world.create_entity(Position { x: 0.0, y: 0.0 }).unwrap();
        let mut range = world.request_entity(Position { x: 1.0, y: 1.0 }, 3, Some(parent)).unwrap();

        let child = world.get_entity(&mut range, 0).unwrap();

        assert_eq!(world.parent_of(child), Some(parent));
        assert_eq!(world.children_of(parent), &[child]);
    }

    #[test]
    fn get_component_mut_writes_are_visible_through_get_component() {
        let mut world = World::new();
        let e = world.create_entity(Position { x: 0.0, y: 0.0 }).unwrap();
        let row = world.locations[e.index()].unwrap();

        world.get_component_mut::<Position>().unwrap().set(row, Position { x: 9.0, y: 9.0 });

        assert_eq!(world.get_component::<Position>().unwrap().get(row), Some(&Position { x: 9.0, y: 9.0 }));
    }

    #[test]
    fn dead_entity_operations_leave_world_unchanged() {
        let mut world = World::new();
        let e = world.create_entity(Position { x: 0.0, y: 0.0 }).unwrap();
        world.remove_entity(e).unwrap();

        assert!(matches!(world.remove_entity(e), Err(EcsError::DeadEntity(_))));
        assert!(matches!(world.attach(e, Velocity { dx: 0.0, dy: 0.0 }), Err(EcsError::DeadEntity(_))));
    }

    #[test]
    fn set_parent_removes_child_from_old_parent_children() {
        let mut world = World::new();
        let p1 = world.create_entity(Position { x: 0.0, y: 0.0 }).unwrap();
        let p2 = world.create_entity(Position { x: 0.0, y: 0.0 }).unwrap();
        let c = world.create_entity(Position { x: 0.0, y: 0.0 }).unwrap();

        world.set_parent(c, p1).unwrap();
        assert_eq!(world.children_of(p1), &[c]);

        world.set_parent(c, p2).unwrap();
        assert!(world.children_of(p1).is_empty());
        assert_eq!(world.children_of(p2), &[c]);
    }

    #[test]
    fn remove_entity_cascades_to_children() {
        let mut world = World::new();
        let parent = world.create_entity(Position { x: 0.0, y: 0.0 }).unwrap();
        let child = world.create_entity(Position { x: 0.0, y: 0.0 }).unwrap();
        world.set_parent(child, parent).unwrap();

        world.remove_entity(parent).unwrap();

        assert!(!world.is_alive(parent));
        assert!(!world.is_alive(child));
    }
}
