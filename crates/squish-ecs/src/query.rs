#![allow(private_interfaces)]

use std::any::TypeId;
use std::collections::HashMap;

use crate::component::{ComponentStorage, SparseSet};
use crate::entity::Entity;

/// Trait implemented for read-only query parameter types (`&T`, `Option<&T>`
/// and tuples of them).
///
/// Mutable access goes through [`crate::World::get_mut`] so that a shared
/// borrow of the world never hands out aliasing `&mut` references.
pub trait WorldQuery {
    type Item<'w>;

    /// The TypeIds of components this query requires (must be present on the entity).
    fn required_type_ids() -> Vec<TypeId>;

    /// Fetch the item for a given entity index from the storages map.
    fn fetch<'w>(
        storages: &'w HashMap<TypeId, Box<dyn ComponentStorage>>,
        index: u32,
    ) -> Option<Self::Item<'w>>;
}

fn sparse_set<T: 'static + Send + Sync>(
    storages: &HashMap<TypeId, Box<dyn ComponentStorage>>,
) -> Option<&SparseSet<T>> {
    storages
        .get(&TypeId::of::<T>())
        .and_then(|storage| storage.as_any().downcast_ref::<SparseSet<T>>())
}

impl<T: 'static + Send + Sync> WorldQuery for &T {
    type Item<'w> = &'w T;

    fn required_type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<T>()]
    }

    fn fetch<'w>(
        storages: &'w HashMap<TypeId, Box<dyn ComponentStorage>>,
        index: u32,
    ) -> Option<Self::Item<'w>> {
        sparse_set::<T>(storages)?.get(index)
    }
}

impl<T: 'static + Send + Sync> WorldQuery for Option<&T> {
    type Item<'w> = Option<&'w T>;

    fn required_type_ids() -> Vec<TypeId> {
        vec![]
    }

    fn fetch<'w>(
        storages: &'w HashMap<TypeId, Box<dyn ComponentStorage>>,
        index: u32,
    ) -> Option<Self::Item<'w>> {
        Some(sparse_set::<T>(storages).and_then(|set| set.get(index)))
    }
}

macro_rules! impl_world_query_tuple {
    ($($name:ident),+) => {
        impl<$($name: WorldQuery),+> WorldQuery for ($($name,)+) {
            type Item<'w> = ($($name::Item<'w>,)+);

            fn required_type_ids() -> Vec<TypeId> {
                let mut ids = Vec::new();
                $(ids.extend($name::required_type_ids());)+
                ids
            }

            fn fetch<'w>(
                storages: &'w HashMap<TypeId, Box<dyn ComponentStorage>>,
                index: u32,
            ) -> Option<Self::Item<'w>> {
                Some(($($name::fetch(storages, index)?,)+))
            }
        }
    };
}

impl_world_query_tuple!(A);
impl_world_query_tuple!(A, B);
impl_world_query_tuple!(A, B, C);
impl_world_query_tuple!(A, B, C, D);
impl_world_query_tuple!(A, B, C, D, E);

/// Iterator returned by `World::query`. Yields `(Entity, Q::Item)` for each
/// entity whose mask contains every required component.
pub struct QueryIter<'w, Q: WorldQuery> {
    pub(crate) storages: &'w HashMap<TypeId, Box<dyn ComponentStorage>>,
    pub(crate) candidates: std::vec::IntoIter<Entity>,
    pub(crate) _marker: std::marker::PhantomData<Q>,
}

impl<'w, Q: WorldQuery> Iterator for QueryIter<'w, Q> {
    type Item = (Entity, Q::Item<'w>);

    fn next(&mut self) -> Option<Self::Item> {
        for entity in self.candidates.by_ref() {
            if let Some(item) = Q::fetch(self.storages, entity.index) {
                return Some((entity, item));
            }
        }
        None
    }
}
