use std::any::{type_name, TypeId};

use crate::component::Component;
use crate::entity::Entity;
use crate::error::EcsError;
use crate::mask::ComponentMask;
use crate::world::World;

/// Declarative description of the entities a system is interested in.
///
/// # Example
/// ```ignore
/// let pending = QueryDescriptor::new("rigid_bodies")
///     .with::<RigidBody>()
///     .without::<Frozen>()
///     .mandatory()
///     .listen_added();
/// ```
#[derive(Clone, Debug)]
pub struct QueryDescriptor {
    name: &'static str,
    with: Vec<(TypeId, &'static str)>,
    without: Vec<(TypeId, &'static str)>,
    mandatory: bool,
    listen_added: bool,
}

impl QueryDescriptor {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            with: Vec::new(),
            without: Vec::new(),
            mandatory: false,
            listen_added: false,
        }
    }

    /// Require component `T` on matching entities.
    pub fn with<T: Component>(mut self) -> Self {
        self.with.push((TypeId::of::<T>(), type_name::<T>()));
        self
    }

    /// Exclude entities carrying component `T`.
    pub fn without<T: Component>(mut self) -> Self {
        self.without.push((TypeId::of::<T>(), type_name::<T>()));
        self
    }

    /// The owning system is skipped while this query is unsatisfied.
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Track entities that newly match since the previous update.
    pub fn listen_added(mut self) -> Self {
        self.listen_added = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    pub fn listens_added(&self) -> bool {
        self.listen_added
    }
}

/// A [`QueryDescriptor`] resolved against a world's component registry, plus
/// the per-entity bookkeeping behind the `added` listener.
#[derive(Debug)]
pub struct QueryState {
    descriptor: QueryDescriptor,
    with: ComponentMask,
    without: ComponentMask,
    /// Generation of the entity that matched in each slot at the last update.
    matched: Vec<Option<u32>>,
    results: Vec<Entity>,
    added: Vec<Entity>,
}

impl QueryState {
    /// Resolve the descriptor, registering any component type not seen yet.
    pub fn new(world: &mut World, descriptor: QueryDescriptor) -> Result<Self, EcsError> {
        let mut with = ComponentMask::EMPTY;
        for &(type_id, name) in &descriptor.with {
            with.insert(world.register_component_raw(type_id, name)?);
        }
        let mut without = ComponentMask::EMPTY;
        for &(type_id, name) in &descriptor.without {
            without.insert(world.register_component_raw(type_id, name)?);
        }
        Ok(Self {
            descriptor,
            with,
            without,
            matched: Vec::new(),
            results: Vec::new(),
            added: Vec::new(),
        })
    }

    /// Re-evaluate the query against the current mask table.
    pub fn update(&mut self, world: &World) {
        self.results.clear();
        self.added.clear();
        self.matched.resize(world.slot_capacity(), None);

        for (entity, mask) in world.entity_masks() {
            let slot = &mut self.matched[entity.index as usize];
            if mask.matches(self.with, self.without) {
                if *slot != Some(entity.generation) {
                    self.added.push(entity);
                }
                *slot = Some(entity.generation);
                self.results.push(entity);
            } else {
                *slot = None;
            }
        }
    }

    /// Entities matching at the last update.
    pub fn results(&self) -> &[Entity] {
        &self.results
    }

    /// Entities that started matching at the last update. Always empty when
    /// the descriptor does not listen for additions.
    pub fn added(&self) -> &[Entity] {
        if self.descriptor.listen_added {
            &self.added
        } else {
            &[]
        }
    }

    /// A mandatory query is satisfied when it has work: newly added entities
    /// for a listening query, any result otherwise.
    pub fn is_satisfied(&self) -> bool {
        if !self.descriptor.mandatory {
            return true;
        }
        if self.descriptor.listen_added {
            !self.added.is_empty()
        } else {
            !self.results.is_empty()
        }
    }

    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }
}
