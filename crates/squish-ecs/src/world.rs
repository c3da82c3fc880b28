use std::any::{type_name, TypeId};
use std::collections::HashMap;

use crate::component::{Component, ComponentStorage, SparseSet};
use crate::entity::{Entity, EntityAllocator};
use crate::error::EcsError;
use crate::mask::{ComponentId, ComponentMask, ComponentRegistry};
use crate::query::{QueryIter, WorldQuery};

/// The entity-component store. Owns all entities and their components, and
/// keeps one [`ComponentMask`] per entity slot for query evaluation.
pub struct World {
    entities: EntityAllocator,
    pub(crate) components: HashMap<TypeId, Box<dyn ComponentStorage>>,
    registry: ComponentRegistry,
    masks: Vec<ComponentMask>,
}

impl World {
    pub fn new() -> Self {
        Self {
            entities: EntityAllocator::new(),
            components: HashMap::new(),
            registry: ComponentRegistry::default(),
            masks: Vec::new(),
        }
    }

    // ---- Entity management ----

    /// Spawn a new entity with no components.
    pub fn spawn(&mut self) -> Entity {
        let entity = self.entities.allocate();
        let slot = entity.index as usize;
        if slot >= self.masks.len() {
            self.masks.resize(slot + 1, ComponentMask::EMPTY);
        }
        self.masks[slot] = ComponentMask::EMPTY;
        entity
    }

    /// Despawn an entity, removing all its components.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.entities.deallocate(entity) {
            return false;
        }
        for storage in self.components.values_mut() {
            storage.remove(entity.index);
        }
        self.masks[entity.index as usize] = ComponentMask::EMPTY;
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of alive entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Enumerate all live entities in slot order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter_alive()
    }

    pub(crate) fn slot_capacity(&self) -> usize {
        self.entities.capacity()
    }

    pub(crate) fn entity_masks(&self) -> impl Iterator<Item = (Entity, ComponentMask)> + '_ {
        self.entities
            .iter_alive()
            .map(|entity| (entity, self.masks[entity.index as usize]))
    }

    // ---- Component registration ----

    /// Assign a mask bit to `T` ahead of first use.
    pub fn register_component<T: Component>(&mut self) -> Result<ComponentId, EcsError> {
        self.registry.register(TypeId::of::<T>(), type_name::<T>())
    }

    pub(crate) fn register_component_raw(
        &mut self,
        type_id: TypeId,
        name: &'static str,
    ) -> Result<ComponentId, EcsError> {
        self.registry.register(type_id, name)
    }

    /// The component mask of a live entity (empty for dead entities).
    pub fn mask(&self, entity: Entity) -> ComponentMask {
        if !self.entities.is_alive(entity) {
            return ComponentMask::EMPTY;
        }
        self.masks[entity.index as usize]
    }

    /// Type names of the components attached to an entity, in registration order.
    pub fn component_names(&self, entity: Entity) -> Vec<&'static str> {
        self.mask(entity)
            .ids()
            .map(|id| self.registry.name(id))
            .collect()
    }

    // ---- Component management ----

    fn storage_mut<T: Component>(&mut self) -> &mut SparseSet<T> {
        self.components
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(SparseSet::<T>::new()))
            .as_any_mut()
            .downcast_mut::<SparseSet<T>>()
            .expect("component type mismatch")
    }

    fn storage<T: Component>(&self) -> Option<&SparseSet<T>> {
        self.components
            .get(&TypeId::of::<T>())
            .and_then(|s| s.as_any().downcast_ref::<SparseSet<T>>())
    }

    /// Insert a component on an entity. Replaces any existing component of the same type.
    ///
    /// # Panics
    /// Panics if the entity is dead or if `T` would exceed the component type limit.
    pub fn insert<T: Component>(&mut self, entity: Entity, component: T) {
        assert!(
            self.entities.is_alive(entity),
            "cannot insert component on dead entity {entity:?}"
        );
        let id = match self.register_component::<T>() {
            Ok(id) => id,
            Err(err) => panic!("{err}"),
        };
        self.storage_mut::<T>().insert(entity.index, component);
        self.masks[entity.index as usize].insert(id);
    }

    /// Get an immutable reference to a component on an entity.
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.storage::<T>()?.get(entity.index)
    }

    /// Get a mutable reference to a component on an entity.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.components
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<SparseSet<T>>()?
            .get_mut(entity.index)
    }

    /// Remove a component from an entity. Returns `true` if it was present.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> bool {
        if !self.entities.is_alive(entity) {
            return false;
        }
        let removed = self
            .components
            .get_mut(&TypeId::of::<T>())
            .is_some_and(|storage| storage.remove(entity.index));
        if removed {
            if let Some(id) = self.registry.id_of(TypeId::of::<T>()) {
                self.masks[entity.index as usize].remove(id);
            }
        }
        removed
    }

    /// Check whether an entity has a component of the given type.
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.registry
            .id_of(TypeId::of::<T>())
            .is_some_and(|id| self.mask(entity).contains(id))
    }

    // ---- Queries ----

    /// Query entities that carry every component named by `Q`.
    ///
    /// # Example
    /// ```ignore
    /// for (entity, (body, object)) in world.query::<(&RigidBody, &Object3D)>() {
    ///     // ...
    /// }
    /// ```
    pub fn query<Q: WorldQuery>(&self) -> QueryIter<'_, Q> {
        let mut required = ComponentMask::EMPTY;
        let mut resolvable = true;
        for type_id in Q::required_type_ids() {
            match self.registry.id_of(type_id) {
                Some(id) => required.insert(id),
                None => resolvable = false,
            }
        }

        // A required type never registered means no entity can match.
        let candidates: Vec<Entity> = if resolvable {
            self.entity_masks()
                .filter(|(_, mask)| mask.contains_all(required))
                .map(|(entity, _)| entity)
                .collect()
        } else {
            Vec::new()
        };

        QueryIter {
            storages: &self.components,
            candidates: candidates.into_iter(),
            _marker: std::marker::PhantomData,
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
