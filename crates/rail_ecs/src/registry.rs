//! Entity allocation, recycling and membership tracking.
//!
//! The registry is the single source of truth for entity liveness. Each slot
//! remembers its current generation and the component kinds that currently
//! hold data for the entity living in it, so destruction knows exactly which
//! tables to purge.

use crate::component::ComponentTypeId;
use crate::entity::Entity;
use crate::error::EntityError;

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    alive: bool,
    /// Component kinds holding a record for the occupant, in attach order.
    components: Vec<ComponentTypeId>,
}

/// Allocates and recycles [`Entity`] handles.
///
/// ```text
/// slots:     [g0 alive, g1 free, g0 alive]
/// free_list: [1]          <- popped by the next create()
/// ```
///
/// A slot's generation is bumped when its entity is destroyed, so the next
/// occupant is issued a handle that never compares equal to the old one.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    live: usize,
}

impl EntityRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh entity, reusing a freed slot when one is available.
    pub fn create(&mut self) -> Entity {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.alive = true;
            return Entity::from_raw_parts(index, slot.generation);
        }

        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            alive: true,
            components: Vec::new(),
        });
        Entity::from_raw_parts(index, 0)
    }

    /// Destroy an entity.
    ///
    /// Returns the component kinds that held data for it; the caller is
    /// responsible for dropping those records.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::InvalidEntity`] if the handle is stale or was
    /// never issued.
    pub fn destroy(&mut self, entity: Entity) -> Result<Vec<ComponentTypeId>, EntityError> {
        let slot = self.live_slot_mut(entity)?;
        slot.alive = false;
        slot.generation = slot.generation.wrapping_add(1);
        let components = std::mem::take(&mut slot.components);
        self.free_list.push(entity.index());
        self.live -= 1;
        Ok(components)
    }

    /// Returns `true` if the handle refers to a live entity.
    #[must_use]
    pub fn is_valid(&self, entity: Entity) -> bool {
        self.slots
            .get(entity.index() as usize)
            .is_some_and(|slot| slot.alive && slot.generation == entity.generation())
    }

    /// Like [`is_valid`](Self::is_valid), but as a `Result` for `?`.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::InvalidEntity`] for stale handles.
    pub fn validate(&self, entity: Entity) -> Result<(), EntityError> {
        if self.is_valid(entity) {
            Ok(())
        } else {
            Err(EntityError::InvalidEntity(entity))
        }
    }

    /// Record that `component` now holds data for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::InvalidEntity`] for stale handles.
    pub fn attach(&mut self, entity: Entity, component: ComponentTypeId) -> Result<(), EntityError> {
        let slot = self.live_slot_mut(entity)?;
        if !slot.components.contains(&component) {
            slot.components.push(component);
        }
        Ok(())
    }

    /// Record that `component` no longer holds data for `entity`.
    ///
    /// Stale handles are ignored.
    pub fn detach(&mut self, entity: Entity, component: ComponentTypeId) {
        if let Ok(slot) = self.live_slot_mut(entity) {
            slot.components.retain(|&c| c != component);
        }
    }

    /// Component kinds holding data for `entity`, in attach order.
    ///
    /// Empty for stale handles.
    #[must_use]
    pub fn components_of(&self, entity: Entity) -> &[ComponentTypeId] {
        if !self.is_valid(entity) {
            return &[];
        }
        &self.slots[entity.index() as usize].components
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no entity is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate over every live entity, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots.iter().enumerate().filter(|(_, s)| s.alive).map(|(i, s)| {
            Entity::from_raw_parts(u32::try_from(i).unwrap_or(u32::MAX), s.generation)
        })
    }

    fn live_slot_mut(&mut self, entity: Entity) -> Result<&mut Slot, EntityError> {
        match self.slots.get_mut(entity.index() as usize) {
            Some(slot) if slot.alive && slot.generation == entity.generation() => Ok(slot),
            _ => Err(EntityError::InvalidEntity(entity)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_produces_distinct_entities() {
        let mut registry = EntityRegistry::new();
        let e1 = registry.create();
        let e2 = registry.create();
        assert_ne!(e1, e2);
        assert_eq!(registry.len(), 2);
        assert!(registry.is_valid(e1));
        assert!(registry.is_valid(e2));
    }

    #[test]
    fn test_destroy_invalidates_handle() {
        let mut registry = EntityRegistry::new();
        let e = registry.create();
        registry.destroy(e).unwrap();
        assert!(!registry.is_valid(e));
        assert!(registry.is_empty());
        assert!(matches!(registry.validate(e), Err(EntityError::InvalidEntity(x)) if x == e));
    }

    #[test]
    fn test_recycled_slot_gets_new_generation() {
        let mut registry = EntityRegistry::new();
        let old = registry.create();
        registry.destroy(old).unwrap();
        let recycled = registry.create();

        assert_eq!(recycled.index(), old.index());
        assert_eq!(recycled.generation(), old.generation() + 1);
        assert!(registry.is_valid(recycled));
        assert!(!registry.is_valid(old));
    }

    #[test]
    fn test_double_destroy_fails() {
        let mut registry = EntityRegistry::new();
        let e = registry.create();
        registry.destroy(e).unwrap();
        assert!(registry.destroy(e).is_err());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_membership_tracking() {
        let mut registry = EntityRegistry::new();
        let e = registry.create();
        let a = ComponentTypeId::from_name("A");
        let b = ComponentTypeId::from_name("B");

        registry.attach(e, a).unwrap();
        registry.attach(e, b).unwrap();
        registry.attach(e, a).unwrap();
        assert_eq!(registry.components_of(e), &[a, b]);

        registry.detach(e, a);
        assert_eq!(registry.components_of(e), &[b]);

        let purged = registry.destroy(e).unwrap();
        assert_eq!(purged, vec![b]);
        assert!(registry.components_of(e).is_empty());
    }

    #[test]
    fn test_iter_skips_dead_slots() {
        let mut registry = EntityRegistry::new();
        let e1 = registry.create();
        let e2 = registry.create();
        let e3 = registry.create();
        registry.destroy(e2).unwrap();
        let live: Vec<_> = registry.iter().collect();
        assert_eq!(live, vec![e1, e3]);
    }
}
