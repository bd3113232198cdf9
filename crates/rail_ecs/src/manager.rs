//! The entity manager: registry, component slots and per-frame dispatch.
//!
//! Components are registered once, in the order they must update. Each slot
//! pairs the behaviour object with its data table:
//!
//! ```text
//! slots: [Transform | DataTable<TransformData>]
//!        [Physics   | DataTable<PhysicsData>  ]
//!        [Player    | DataTable<PlayerData>   ]
//! ```
//!
//! While a component updates, its behaviour object is taken out of the slot,
//! so the component gets `&mut EntityManager` without aliasing itself. Its
//! table stays in place and remains reachable through the manager.
//!
//! ## Passes
//!
//! [`update_all`](EntityManager::update_all) snapshots every table's extent
//! before the first component runs. Rows appended during the frame (spawns,
//! late additions) lie beyond that snapshot and are first visited next frame.
//! Removals leave tombstones until the outermost pass ends, then every table
//! is compacted.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::component::{Component, ComponentMeta, ComponentTypeId, ErasedComponent};
use crate::entity::Entity;
use crate::error::EntityError;
use crate::factory::EntityFactory;
use crate::prototype::{Template, TemplateComponent};
use crate::registry::EntityRegistry;
use crate::services::Services;
use crate::table::{DataTable, ErasedTable};

/// Simulation time in seconds.
pub type WorldTime = f64;

struct ComponentSlot {
    meta: ComponentMeta,
    /// `None` while the component is inside its own `init` or `update`.
    behavior: Option<Box<dyn ErasedComponent>>,
    table: Box<dyn ErasedTable>,
}

/// Owns every entity and every component's data.
pub struct EntityManager {
    registry: EntityRegistry,
    slots: Vec<ComponentSlot>,
    slot_index: HashMap<ComponentTypeId, usize>,
    services: Services,
    factory: Option<Rc<EntityFactory>>,
    frame: u64,
    pass_depth: u32,
    /// Per-table traversal bounds captured at the start of `update_all`.
    frame_bounds: Option<Vec<usize>>,
    /// Entities whose update failed during the current frame.
    faulted: HashSet<Entity>,
    initialized: bool,
}

impl EntityManager {
    /// Create an empty manager around a services context.
    #[must_use]
    pub fn new(services: Services) -> Self {
        Self {
            registry: EntityRegistry::new(),
            slots: Vec::new(),
            slot_index: HashMap::new(),
            services,
            factory: None,
            frame: 0,
            pass_depth: 0,
            frame_bounds: None,
            faulted: HashSet::new(),
            initialized: false,
        }
    }

    // ---- registration ----------------------------------------------------

    /// Register a component kind. Registration order is update order and
    /// import order.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::AlreadyRegistered`] for a kind registered twice
    /// and [`EntityError::RegistrationClosed`] once
    /// [`init_components`](Self::init_components) has run.
    pub fn register_component<C: Component>(&mut self, component: C) -> Result<(), EntityError> {
        if self.initialized {
            return Err(EntityError::RegistrationClosed(C::type_name()));
        }
        let meta = ComponentMeta::of::<C>();
        if self.slot_index.contains_key(&meta.type_id) {
            return Err(EntityError::AlreadyRegistered(C::type_name()));
        }

        self.slot_index.insert(meta.type_id, self.slots.len());
        self.slots.push(ComponentSlot {
            meta,
            behavior: Some(Box::new(component)),
            table: ComponentMeta::new_table::<C>(),
        });

        debug!(component = meta.name, order = self.slots.len() - 1, "registered component");
        Ok(())
    }

    /// Run every component's `init`, in registration order, and close
    /// registration.
    ///
    /// Calling this a second time does nothing.
    ///
    /// # Errors
    ///
    /// Returns the first `init` failure. Components after the failing one are
    /// not initialised.
    pub fn init_components(&mut self) -> Result<(), EntityError> {
        if self.initialized {
            return Ok(());
        }
        self.initialized = true;

        for i in 0..self.slots.len() {
            let Some(mut behavior) = self.slots[i].behavior.take() else {
                continue;
            };
            let result = behavior.init(self);
            self.slots[i].behavior = Some(behavior);
            if let Err(err) = result {
                warn!(component = self.slots[i].meta.name, error = %err, "component init failed");
                return Err(err);
            }
        }

        info!(components = self.slots.len(), "components initialised");
        Ok(())
    }

    /// Returns `true` once [`init_components`](Self::init_components) has run.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Metadata of every registered component kind, in registration order.
    pub fn component_metas(&self) -> impl Iterator<Item = &ComponentMeta> + '_ {
        self.slots.iter().map(|slot| &slot.meta)
    }

    /// Metadata for a registered kind.
    #[must_use]
    pub fn component_meta(&self, type_id: ComponentTypeId) -> Option<&ComponentMeta> {
        let &i = self.slot_index.get(&type_id)?;
        Some(&self.slots[i].meta)
    }

    /// Metadata for a registered kind, looked up by name.
    #[must_use]
    pub fn component_meta_by_name(&self, name: &str) -> Option<&ComponentMeta> {
        self.component_meta(ComponentTypeId::from_name(name))
            .filter(|meta| meta.name == name)
    }

    // ---- frame dispatch --------------------------------------------------

    /// Run one frame: every component's `update`, in registration order.
    pub fn update_all(&mut self, delta_time: WorldTime) {
        self.frame += 1;
        if self.pass_depth == 0 {
            self.frame_bounds = Some(self.slots.iter().map(|s| s.table.extent()).collect());
        }
        self.pass_depth += 1;

        for i in 0..self.slots.len() {
            let Some(mut behavior) = self.slots[i].behavior.take() else {
                continue;
            };
            behavior.update(self, delta_time);
            self.slots[i].behavior = Some(behavior);
        }

        let faulted = self.faulted.len();
        self.end_pass();

        debug!(
            frame = self.frame,
            delta_time,
            entities = self.registry.len(),
            faulted,
            "frame complete"
        );
    }

    /// Visit every entity holding a `C` record, in insertion order.
    ///
    /// The traversal bound is fixed before the first call to `f`: rows added
    /// while it runs are not visited, and rows removed are skipped. Inside
    /// [`update_all`](Self::update_all) the bound is the one captured at the
    /// start of the frame.
    ///
    /// An `Err` from `f` is logged and the entity is skipped by every later
    /// traversal of the current frame.
    pub fn each<C: Component>(
        &mut self,
        mut f: impl FnMut(&mut EntityManager, Entity) -> Result<(), EntityError>,
    ) {
        let Some(&slot) = self.slot_index.get(&C::component_type_id()) else {
            return;
        };
        let bound = match &self.frame_bounds {
            Some(bounds) => bounds.get(slot).copied().unwrap_or(0),
            None => self.slots[slot].table.extent(),
        };

        self.pass_depth += 1;
        for pos in 0..bound {
            let Some(entity) = self.slots[slot].table.entity_at(pos) else {
                continue;
            };
            if self.faulted.contains(&entity) {
                continue;
            }
            if let Err(err) = f(self, entity) {
                warn!(
                    component = C::type_name(),
                    %entity,
                    error = %err,
                    "entity update failed, skipping for the rest of the frame"
                );
                self.faulted.insert(entity);
            }
        }
        self.end_pass();
    }

    fn end_pass(&mut self) {
        self.pass_depth = self.pass_depth.saturating_sub(1);
        if self.pass_depth == 0 {
            self.frame_bounds = None;
            self.faulted.clear();
            self.compact_tables();
        }
    }

    fn compact_tables(&mut self) {
        for slot in &mut self.slots {
            slot.table.compact();
        }
    }

    /// Number of completed or in-progress frames.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    // ---- entity lifecycle ------------------------------------------------

    /// Allocate a new entity with no components.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.registry.create();
        debug!(%entity, "created entity");
        entity
    }

    /// Destroy an entity and drop every record it held.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::InvalidEntity`] for stale handles.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<(), EntityError> {
        let kinds = self.registry.destroy(entity)?;
        for kind in &kinds {
            if let Some(&i) = self.slot_index.get(kind) {
                self.slots[i].table.remove_entity(entity);
            }
        }
        if self.pass_depth == 0 {
            self.compact_tables();
        }
        debug!(%entity, components = kinds.len(), "destroyed entity");
        Ok(())
    }

    /// Returns `true` if `entity` is alive.
    #[must_use]
    pub fn is_valid(&self, entity: Entity) -> bool {
        self.registry.is_valid(entity)
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.registry.len()
    }

    /// Every live entity, in slot order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.registry.iter()
    }

    /// Component kinds holding data for `entity`, in the order it gained them.
    #[must_use]
    pub fn components_of(&self, entity: Entity) -> &[ComponentTypeId] {
        self.registry.components_of(entity)
    }

    // ---- membership ------------------------------------------------------

    /// Give `entity` a default `C` record and run `C::init_entity`.
    ///
    /// # Errors
    ///
    /// See [`add_entity_with`](Self::add_entity_with).
    pub fn add_entity<C: Component>(&mut self, entity: Entity) -> Result<&mut C::Data, EntityError> {
        self.add_entity_with::<C>(entity, C::Data::default())
    }

    /// Give `entity` the `C` record `data` and run `C::init_entity`.
    ///
    /// If `init_entity` fails the record stays in place and the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// [`EntityError::InvalidEntity`] for stale handles,
    /// [`EntityError::UnknownComponent`] if `C` is not registered and
    /// [`EntityError::DuplicateEntity`] if the entity already has a `C`.
    pub fn add_entity_with<C: Component>(
        &mut self,
        entity: Entity,
        data: C::Data,
    ) -> Result<&mut C::Data, EntityError> {
        self.registry.validate(entity)?;
        self.table_mut::<C>()?.add(entity, data)?;
        self.registry.attach(entity, C::component_type_id())?;
        C::init_entity(self, entity)?;
        self.require_mut::<C>(entity)
    }

    /// Return `entity`'s `C` record, adding a default one first if absent.
    ///
    /// This is how `init_entity` declares hard dependencies.
    ///
    /// # Errors
    ///
    /// See [`add_entity_with`](Self::add_entity_with).
    pub fn ensure<C: Component>(&mut self, entity: Entity) -> Result<&mut C::Data, EntityError> {
        if self.has::<C>(entity) {
            return self.require_mut::<C>(entity);
        }
        self.add_entity::<C>(entity)
    }

    /// Install `data` as `entity`'s `C` record.
    ///
    /// An existing record is overwritten in place without re-running
    /// `init_entity`; otherwise this behaves like
    /// [`add_entity_with`](Self::add_entity_with).
    ///
    /// # Errors
    ///
    /// See [`add_entity_with`](Self::add_entity_with).
    pub fn set_entity_data<C: Component>(
        &mut self,
        entity: Entity,
        data: C::Data,
    ) -> Result<&mut C::Data, EntityError> {
        if self.has::<C>(entity) {
            let record = self.require_mut::<C>(entity)?;
            *record = data;
            return Ok(record);
        }
        self.add_entity_with::<C>(entity, data)
    }

    /// Remove `entity`'s `C` record, returning it. A no-op for stale handles
    /// and entities without one.
    pub fn remove_entity_from<C: Component>(&mut self, entity: Entity) -> Option<C::Data> {
        if !self.registry.is_valid(entity) {
            return None;
        }
        let removed = self.table_mut::<C>().ok()?.remove(entity)?;
        self.registry.detach(entity, C::component_type_id());
        if self.pass_depth == 0 {
            self.compact_tables();
        }
        Some(removed)
    }

    /// Returns `true` if `entity` is alive and holds a `C` record.
    #[must_use]
    pub fn has<C: Component>(&self, entity: Entity) -> bool {
        self.lookup::<C>(entity).is_some()
    }

    // ---- data access -----------------------------------------------------

    /// The `C` table, if `C` is registered.
    #[must_use]
    pub fn table<C: Component>(&self) -> Option<&DataTable<C::Data>> {
        let &i = self.slot_index.get(&C::component_type_id())?;
        self.slots[i].table.as_any().downcast_ref()
    }

    fn table_mut<C: Component>(&mut self) -> Result<&mut DataTable<C::Data>, EntityError> {
        self.slot_index
            .get(&C::component_type_id())
            .and_then(|&i| self.slots[i].table.as_any_mut().downcast_mut())
            .ok_or_else(|| EntityError::UnknownComponent(C::type_name().to_string()))
    }

    /// `entity`'s `C` record. `None` for stale handles and entities without
    /// one.
    #[must_use]
    pub fn lookup<C: Component>(&self, entity: Entity) -> Option<&C::Data> {
        if !self.registry.is_valid(entity) {
            return None;
        }
        self.table::<C>()?.get(entity)
    }

    /// `entity`'s `C` record, mutably.
    #[must_use]
    pub fn lookup_mut<C: Component>(&mut self, entity: Entity) -> Option<&mut C::Data> {
        if !self.registry.is_valid(entity) {
            return None;
        }
        self.table_mut::<C>().ok()?.get_mut(entity)
    }

    /// Like [`lookup`](Self::lookup), but explains the absence.
    ///
    /// # Errors
    ///
    /// [`EntityError::InvalidEntity`] for stale handles,
    /// [`EntityError::UnknownComponent`] if `C` is not registered and
    /// [`EntityError::MissingComponent`] if the entity has no `C` record.
    pub fn require<C: Component>(&self, entity: Entity) -> Result<&C::Data, EntityError> {
        self.registry.validate(entity)?;
        self.table::<C>()
            .ok_or_else(|| EntityError::UnknownComponent(C::type_name().to_string()))?
            .get(entity)
            .ok_or(EntityError::MissingComponent {
                component: C::type_name(),
                entity,
            })
    }

    /// Like [`lookup_mut`](Self::lookup_mut), but explains the absence.
    ///
    /// # Errors
    ///
    /// See [`require`](Self::require).
    pub fn require_mut<C: Component>(&mut self, entity: Entity) -> Result<&mut C::Data, EntityError> {
        self.registry.validate(entity)?;
        self.table_mut::<C>()?
            .get_mut(entity)
            .ok_or(EntityError::MissingComponent {
                component: C::type_name(),
                entity,
            })
    }

    /// Mutable access to two different kinds' records for the same entity.
    ///
    /// `None` if `A` and `B` are the same kind, either is unregistered, the
    /// handle is stale or either record is absent.
    #[must_use]
    pub fn lookup_pair_mut<A: Component, B: Component>(
        &mut self,
        entity: Entity,
    ) -> Option<(&mut A::Data, &mut B::Data)> {
        if !self.registry.is_valid(entity) {
            return None;
        }
        let ia = *self.slot_index.get(&A::component_type_id())?;
        let ib = *self.slot_index.get(&B::component_type_id())?;
        if ia == ib {
            return None;
        }

        let (slot_a, slot_b) = if ia < ib {
            let (lo, hi) = self.slots.split_at_mut(ib);
            (&mut lo[ia], &mut hi[0])
        } else {
            let (lo, hi) = self.slots.split_at_mut(ia);
            (&mut hi[0], &mut lo[ib])
        };

        let a = slot_a
            .table
            .as_any_mut()
            .downcast_mut::<DataTable<A::Data>>()?
            .get_mut(entity)?;
        let b = slot_b
            .table
            .as_any_mut()
            .downcast_mut::<DataTable<B::Data>>()?
            .get_mut(entity)?;
        Some((a, b))
    }

    /// The behaviour object of component kind `C`.
    ///
    /// `None` while `C` itself is running `init` or `update`.
    #[must_use]
    pub fn get_component<C: Component>(&self) -> Option<&C> {
        let &i = self.slot_index.get(&C::component_type_id())?;
        self.slots[i].behavior.as_ref()?.as_any().downcast_ref()
    }

    /// The behaviour object of component kind `C`, mutably.
    #[must_use]
    pub fn get_component_mut<C: Component>(&mut self) -> Option<&mut C> {
        let &i = self.slot_index.get(&C::component_type_id())?;
        self.slots[i].behavior.as_mut()?.as_any_mut().downcast_mut()
    }

    // ---- serialisation ---------------------------------------------------

    /// Import an encoded record through the component's `import` hook.
    ///
    /// # Errors
    ///
    /// [`EntityError::UnknownComponent`] for unregistered kinds,
    /// [`EntityError::InvalidEntity`] for stale handles and whatever the hook
    /// reports (usually [`EntityError::Decode`]).
    pub fn import_raw(
        &mut self,
        type_id: ComponentTypeId,
        entity: Entity,
        raw: &[u8],
    ) -> Result<(), EntityError> {
        let meta = *self
            .component_meta(type_id)
            .ok_or_else(|| EntityError::UnknownComponent(format!("{type_id:?}")))?;
        self.registry.validate(entity)?;
        (meta.import_fn)(self, entity, raw)
    }

    /// Encode `entity`'s record for one kind, or `None` if it has none.
    ///
    /// # Errors
    ///
    /// [`EntityError::UnknownComponent`] for unregistered kinds,
    /// [`EntityError::InvalidEntity`] for stale handles and encode failures.
    pub fn export_raw(
        &self,
        type_id: ComponentTypeId,
        entity: Entity,
    ) -> Result<Option<Vec<u8>>, EntityError> {
        let meta = self
            .component_meta(type_id)
            .ok_or_else(|| EntityError::UnknownComponent(format!("{type_id:?}")))?;
        self.registry.validate(entity)?;
        (meta.export_fn)(self, entity)
    }

    /// Export every record `entity` holds into a template named after the
    /// entity. Feeding the result back through the factory reproduces the
    /// entity's data.
    ///
    /// # Errors
    ///
    /// [`EntityError::InvalidEntity`] for stale handles and encode failures.
    pub fn export_entity(&self, entity: Entity) -> Result<Template, EntityError> {
        self.registry.validate(entity)?;
        let mut template = Template::new(entity.to_string());
        for slot in &self.slots {
            if let Some(data) = (slot.meta.export_fn)(self, entity)? {
                template.components.push(TemplateComponent {
                    component: slot.meta.name.to_string(),
                    data,
                });
            }
        }
        Ok(template)
    }

    // ---- context ---------------------------------------------------------

    /// The shared services context.
    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// The shared services context, mutably.
    pub fn services_mut(&mut self) -> &mut Services {
        &mut self.services
    }

    /// Install the factory used by [`spawn_prototype`](Self::spawn_prototype).
    pub fn set_factory(&mut self, factory: Rc<EntityFactory>) {
        self.factory = Some(factory);
    }

    /// The installed factory.
    #[must_use]
    pub fn factory(&self) -> Option<Rc<EntityFactory>> {
        self.factory.clone()
    }

    /// Construct an entity from a named prototype using the installed factory.
    ///
    /// Safe to call from inside a component's update.
    ///
    /// # Errors
    ///
    /// [`EntityError::MissingService`] if no factory is installed, otherwise
    /// see [`EntityFactory::create_from_prototype`].
    pub fn spawn_prototype(&mut self, name: &str) -> Result<Entity, EntityError> {
        let factory = self
            .factory
            .clone()
            .ok_or(EntityError::MissingService("EntityFactory"))?;
        factory.create_from_prototype(name, self)
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new(Services::new())
    }
}

impl fmt::Debug for EntityManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let components: Vec<&str> = self.slots.iter().map(|s| s.meta.name).collect();
        f.debug_struct("EntityManager")
            .field("entities", &self.registry.len())
            .field("components", &components)
            .field("frame", &self.frame)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde::{Deserialize, Serialize};

    use super::*;

    type Log = Rc<RefCell<Vec<String>>>;

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct PositionData {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct VelocityData {
        dx: f32,
        dy: f32,
    }

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct SpawnerData {
        remaining: u32,
    }

    #[derive(Default)]
    struct Position {
        log: Log,
    }

    impl Component for Position {
        type Data = PositionData;

        fn type_name() -> &'static str {
            "Position"
        }

        fn update(&mut self, manager: &mut EntityManager, _dt: WorldTime) {
            let log = self.log.clone();
            manager.each::<Self>(|_, entity| {
                log.borrow_mut().push(format!("Position {}", entity.index()));
                Ok(())
            });
        }
    }

    /// Moves positions; depends on `Position`.
    #[derive(Default)]
    struct Velocity {
        log: Log,
    }

    impl Component for Velocity {
        type Data = VelocityData;

        fn type_name() -> &'static str {
            "Velocity"
        }

        fn init_entity(manager: &mut EntityManager, entity: Entity) -> Result<(), EntityError> {
            manager.ensure::<Position>(entity)?;
            Ok(())
        }

        fn update(&mut self, manager: &mut EntityManager, dt: WorldTime) {
            let log = self.log.clone();
            manager.each::<Self>(|manager, entity| {
                log.borrow_mut().push(format!("Velocity {}", entity.index()));
                let (position, velocity) = manager
                    .lookup_pair_mut::<Position, Velocity>(entity)
                    .ok_or(EntityError::MissingComponent {
                        component: Position::type_name(),
                        entity,
                    })?;
                position.x += velocity.dx * dt as f32;
                position.y += velocity.dy * dt as f32;
                Ok(())
            });
        }
    }

    /// Spawns one moving entity per frame per spawner.
    #[derive(Default)]
    struct Spawner;

    impl Component for Spawner {
        type Data = SpawnerData;

        fn type_name() -> &'static str {
            "Spawner"
        }

        fn update(&mut self, manager: &mut EntityManager, _dt: WorldTime) {
            manager.each::<Self>(|manager, entity| {
                let spawner = manager.require_mut::<Self>(entity)?;
                if spawner.remaining == 0 {
                    return Ok(());
                }
                spawner.remaining -= 1;
                let child = manager.create_entity();
                manager.add_entity_with::<Velocity>(child, VelocityData { dx: 1.0, dy: 0.0 })?;
                Ok(())
            });
        }
    }

    /// Fails for entities whose `x` is negative.
    #[derive(Default)]
    struct Faulty;

    impl Component for Faulty {
        type Data = PositionData;

        fn type_name() -> &'static str {
            "Faulty"
        }

        fn update(&mut self, manager: &mut EntityManager, _dt: WorldTime) {
            manager.each::<Self>(|manager, entity| {
                if manager.require::<Self>(entity)?.x < 0.0 {
                    return Err(EntityError::MissingComponent {
                        component: "Faulty",
                        entity,
                    });
                }
                Ok(())
            });
        }
    }

    fn manager_with_log() -> (EntityManager, Log) {
        let log: Log = Rc::default();
        let mut manager = EntityManager::default();
        manager
            .register_component(Position { log: log.clone() })
            .unwrap();
        manager
            .register_component(Velocity { log: log.clone() })
            .unwrap();
        manager.register_component(Spawner).unwrap();
        manager.init_components().unwrap();
        (manager, log)
    }

    #[test]
    fn test_registration_rules() {
        let mut manager = EntityManager::default();
        manager.register_component(Position::default()).unwrap();
        assert!(matches!(
            manager.register_component(Position::default()),
            Err(EntityError::AlreadyRegistered("Position"))
        ));
        manager.init_components().unwrap();
        assert!(matches!(
            manager.register_component(Spawner),
            Err(EntityError::RegistrationClosed("Spawner"))
        ));
        let names: Vec<&str> = manager.component_metas().map(|m| m.name).collect();
        assert_eq!(names, vec!["Position"]);
    }

    #[test]
    fn test_destroy_clears_every_table() {
        let (mut manager, _) = manager_with_log();
        let e = manager.create_entity();
        manager
            .add_entity_with::<Velocity>(e, VelocityData { dx: 1.0, dy: 2.0 })
            .unwrap();
        manager.add_entity::<Spawner>(e).unwrap();
        assert!(manager.has::<Position>(e));

        manager.destroy_entity(e).unwrap();

        assert!(!manager.is_valid(e));
        assert!(manager.lookup::<Position>(e).is_none());
        assert!(manager.lookup::<Velocity>(e).is_none());
        assert!(manager.lookup::<Spawner>(e).is_none());
        assert!(manager.table::<Velocity>().unwrap().is_empty());
        assert!(matches!(
            manager.require::<Position>(e),
            Err(EntityError::InvalidEntity(_))
        ));
    }

    #[test]
    fn test_recycled_handle_does_not_alias() {
        let (mut manager, _) = manager_with_log();
        let old = manager.create_entity();
        manager
            .add_entity_with::<Position>(old, PositionData { x: 1.0, y: 1.0 })
            .unwrap();
        manager.destroy_entity(old).unwrap();

        let new = manager.create_entity();
        manager
            .add_entity_with::<Position>(new, PositionData { x: 9.0, y: 9.0 })
            .unwrap();

        assert_eq!(new.index(), old.index());
        assert!(manager.lookup::<Position>(old).is_none());
        assert_eq!(manager.lookup::<Position>(new).unwrap().x, 9.0);
    }

    #[test]
    fn test_init_entity_forces_dependency() {
        let (mut manager, _) = manager_with_log();
        let e = manager.create_entity();
        manager.add_entity::<Velocity>(e).unwrap();
        assert_eq!(manager.lookup::<Position>(e), Some(&PositionData::default()));
        assert_eq!(
            manager.components_of(e),
            &[Velocity::component_type_id(), Position::component_type_id()]
        );
    }

    #[test]
    fn test_ensure_keeps_existing_data() {
        let (mut manager, _) = manager_with_log();
        let e = manager.create_entity();
        manager
            .add_entity_with::<Position>(e, PositionData { x: 3.0, y: 4.0 })
            .unwrap();
        manager.add_entity::<Velocity>(e).unwrap();
        assert_eq!(manager.lookup::<Position>(e).unwrap().x, 3.0);
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let (mut manager, _) = manager_with_log();
        let e = manager.create_entity();
        manager.add_entity::<Position>(e).unwrap();
        assert!(matches!(
            manager.add_entity::<Position>(e),
            Err(EntityError::DuplicateEntity { .. })
        ));
    }

    #[test]
    fn test_lookup_never_fabricates_data() {
        let (mut manager, _) = manager_with_log();
        let e = manager.create_entity();
        assert!(manager.lookup::<Position>(e).is_none());
        assert!(matches!(
            manager.require::<Position>(e),
            Err(EntityError::MissingComponent {
                component: "Position",
                ..
            })
        ));
        assert!(manager.lookup::<Position>(e).is_none());
    }

    #[test]
    fn test_update_order_follows_registration() {
        let (mut manager, log) = manager_with_log();
        let e = manager.create_entity();
        manager.add_entity::<Velocity>(e).unwrap();

        manager.update_all(1.0);

        assert_eq!(*log.borrow(), vec!["Position 0", "Velocity 0"]);
    }

    #[test]
    fn test_spawned_entities_wait_for_next_frame() {
        let (mut manager, log) = manager_with_log();
        let spawner = manager.create_entity();
        manager
            .add_entity_with::<Spawner>(spawner, SpawnerData { remaining: 1 })
            .unwrap();

        // Spawner runs last, so nothing it spawns is visited this frame.
        manager.update_all(1.0);
        assert!(log.borrow().is_empty());
        assert_eq!(manager.entity_count(), 2);

        manager.update_all(1.0);
        let child = manager.table::<Velocity>().unwrap().entities()[0];
        assert_eq!(
            *log.borrow(),
            vec![
                format!("Position {}", child.index()),
                format!("Velocity {}", child.index())
            ]
        );
        assert_eq!(manager.lookup::<Position>(child).unwrap().x, 1.0);
    }

    #[test]
    fn test_spawn_from_earlier_component_is_not_visited_by_later_ones() {
        let log: Log = Rc::default();
        let mut manager = EntityManager::default();
        manager.register_component(Spawner).unwrap();
        manager
            .register_component(Position { log: log.clone() })
            .unwrap();
        manager
            .register_component(Velocity { log: log.clone() })
            .unwrap();
        manager.init_components().unwrap();

        let spawner = manager.create_entity();
        manager
            .add_entity_with::<Spawner>(spawner, SpawnerData { remaining: 1 })
            .unwrap();

        manager.update_all(1.0);
        assert!(log.borrow().is_empty());

        manager.update_all(1.0);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_destroy_during_pass_skips_removed_rows() {
        let (mut manager, log) = manager_with_log();
        let a = manager.create_entity();
        let b = manager.create_entity();
        let c = manager.create_entity();
        for e in [a, b, c] {
            manager.add_entity::<Position>(e).unwrap();
        }

        manager.each::<Position>(|manager, entity| {
            if entity == a {
                manager.destroy_entity(b)?;
            }
            log.borrow_mut().push(format!("{}", entity.index()));
            Ok(())
        });

        assert_eq!(*log.borrow(), vec!["0", "2"]);
        // Compacted once the pass ended.
        assert_eq!(manager.table::<Position>().unwrap().extent(), 2);
    }

    #[test]
    fn test_faulted_entity_is_isolated_for_the_frame() {
        let log: Log = Rc::default();
        let mut manager = EntityManager::default();
        manager.register_component(Faulty).unwrap();
        manager
            .register_component(Position { log: log.clone() })
            .unwrap();
        manager.init_components().unwrap();

        let bad = manager.create_entity();
        let good = manager.create_entity();
        manager
            .add_entity_with::<Faulty>(bad, PositionData { x: -1.0, y: 0.0 })
            .unwrap();
        manager.add_entity::<Faulty>(good).unwrap();
        manager.add_entity::<Position>(bad).unwrap();
        manager.add_entity::<Position>(good).unwrap();

        manager.update_all(1.0);
        assert_eq!(*log.borrow(), vec![format!("Position {}", good.index())]);
        assert!(manager.is_valid(bad));

        // Faults do not carry over; a fixed entity is visited again.
        manager.lookup_mut::<Faulty>(bad).unwrap().x = 1.0;
        log.borrow_mut().clear();
        manager.update_all(1.0);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_lookup_pair_mut() {
        let (mut manager, _) = manager_with_log();
        let e = manager.create_entity();
        manager
            .add_entity_with::<Velocity>(e, VelocityData { dx: 2.0, dy: 0.0 })
            .unwrap();

        let (position, velocity) = manager.lookup_pair_mut::<Position, Velocity>(e).unwrap();
        position.x += velocity.dx;
        assert_eq!(manager.lookup::<Position>(e).unwrap().x, 2.0);

        let (velocity, position) = manager.lookup_pair_mut::<Velocity, Position>(e).unwrap();
        velocity.dy = position.x;
        assert_eq!(manager.lookup::<Velocity>(e).unwrap().dy, 2.0);

        assert!(manager.lookup_pair_mut::<Position, Position>(e).is_none());
    }

    #[test]
    fn test_velocity_integrates_position() {
        let (mut manager, _) = manager_with_log();
        let e = manager.create_entity();
        manager
            .add_entity_with::<Velocity>(e, VelocityData { dx: 1.0, dy: -2.0 })
            .unwrap();
        manager.update_all(0.5);
        assert_eq!(
            manager.lookup::<Position>(e),
            Some(&PositionData { x: 0.5, y: -1.0 })
        );
    }

    #[test]
    fn test_get_component() {
        let (mut manager, _) = manager_with_log();
        assert!(manager.get_component::<Spawner>().is_some());
        assert!(manager.get_component_mut::<Position>().is_some());
        assert!(manager.get_component::<Faulty>().is_none());
    }

    #[test]
    fn test_set_entity_data_replaces_in_place() {
        let (mut manager, _) = manager_with_log();
        let a = manager.create_entity();
        let b = manager.create_entity();
        manager.add_entity::<Position>(a).unwrap();
        manager.add_entity::<Position>(b).unwrap();
        manager
            .set_entity_data::<Position>(a, PositionData { x: 7.0, y: 0.0 })
            .unwrap();
        assert_eq!(manager.table::<Position>().unwrap().entities(), vec![a, b]);
        assert_eq!(manager.lookup::<Position>(a).unwrap().x, 7.0);
    }

    #[test]
    fn test_remove_entity_from() {
        let (mut manager, _) = manager_with_log();
        let e = manager.create_entity();
        manager.add_entity::<Velocity>(e).unwrap();
        assert!(manager.remove_entity_from::<Velocity>(e).is_some());
        assert!(manager.remove_entity_from::<Velocity>(e).is_none());
        assert_eq!(manager.components_of(e), &[Position::component_type_id()]);
        assert!(manager.is_valid(e));
    }

    #[test]
    fn test_export_and_import_raw() {
        let (mut manager, _) = manager_with_log();
        let src = manager.create_entity();
        manager
            .add_entity_with::<Position>(src, PositionData { x: 1.5, y: -2.5 })
            .unwrap();
        let bytes = manager
            .export_raw(Position::component_type_id(), src)
            .unwrap()
            .unwrap();

        let dst = manager.create_entity();
        manager
            .import_raw(Position::component_type_id(), dst, &bytes)
            .unwrap();
        assert_eq!(manager.lookup::<Position>(dst), manager.lookup::<Position>(src));

        assert_eq!(
            manager
                .export_raw(Velocity::component_type_id(), dst)
                .unwrap(),
            None
        );
        assert!(matches!(
            manager.import_raw(ComponentTypeId::from_name("Nope"), dst, &bytes),
            Err(EntityError::UnknownComponent(_))
        ));
    }

    #[test]
    fn test_export_entity_lists_components_in_registration_order() {
        let (mut manager, _) = manager_with_log();
        let e = manager.create_entity();
        manager.add_entity::<Spawner>(e).unwrap();
        manager.add_entity::<Velocity>(e).unwrap();

        let template = manager.export_entity(e).unwrap();
        let names: Vec<&str> = template
            .components
            .iter()
            .map(|c| c.component.as_str())
            .collect();
        assert_eq!(names, vec!["Position", "Velocity", "Spawner"]);
    }

    #[test]
    fn test_spawn_prototype_without_factory() {
        let (mut manager, _) = manager_with_log();
        assert!(matches!(
            manager.spawn_prototype("Projectile"),
            Err(EntityError::MissingService("EntityFactory"))
        ));
        assert_eq!(manager.entity_count(), 0);
    }
}
