use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::ops::BitOr;

use crate::error::EcsError;

/// Maximum number of distinct component types a world can register.
pub const MAX_COMPONENT_TYPES: usize = u64::BITS as usize;

/// Bit position assigned to a registered component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u8);

impl ComponentId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Set of component types, one bit per registered [`ComponentId`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ComponentMask(u64);

impl ComponentMask {
    pub const EMPTY: ComponentMask = ComponentMask(0);

    pub fn of(id: ComponentId) -> Self {
        Self(1u64 << id.0)
    }

    pub fn insert(&mut self, id: ComponentId) {
        self.0 |= 1u64 << id.0;
    }

    pub fn remove(&mut self, id: ComponentId) {
        self.0 &= !(1u64 << id.0);
    }

    pub fn contains(self, id: ComponentId) -> bool {
        self.0 & (1u64 << id.0) != 0
    }

    /// Whether every bit of `other` is also set in `self`.
    pub fn contains_all(self, other: ComponentMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: ComponentMask) -> bool {
        self.0 & other.0 != 0
    }

    /// The query test: all of `with` present and none of `without`.
    pub fn matches(self, with: ComponentMask, without: ComponentMask) -> bool {
        self.contains_all(with) && !self.intersects(without)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate over the component ids set in this mask, lowest bit first.
    pub fn ids(self) -> impl Iterator<Item = ComponentId> {
        (0..MAX_COMPONENT_TYPES as u8)
            .filter(move |bit| self.0 & (1u64 << *bit) != 0)
            .map(ComponentId)
    }
}

impl BitOr for ComponentMask {
    type Output = ComponentMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        ComponentMask(self.0 | rhs.0)
    }
}

impl fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentMask({:#b})", self.0)
    }
}

/// Assigns stable bit positions to component types in registration order.
#[derive(Default)]
pub(crate) struct ComponentRegistry {
    ids: HashMap<TypeId, ComponentId>,
    names: Vec<&'static str>,
}

impl ComponentRegistry {
    /// Return the id of a type, registering it on first sight.
    pub fn register(&mut self, type_id: TypeId, name: &'static str) -> Result<ComponentId, EcsError> {
        if let Some(&id) = self.ids.get(&type_id) {
            return Ok(id);
        }
        if self.names.len() >= MAX_COMPONENT_TYPES {
            return Err(EcsError::TooManyComponents(name));
        }
        let id = ComponentId(self.names.len() as u8);
        self.ids.insert(type_id, id);
        self.names.push(name);
        Ok(id)
    }

    pub fn id_of(&self, type_id: TypeId) -> Option<ComponentId> {
        self.ids.get(&type_id).copied()
    }

    pub fn name(&self, id: ComponentId) -> &'static str {
        self.names[id.index()]
    }
}
