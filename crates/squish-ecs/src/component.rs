use std::any::Any;

/// Marker trait for types that can be stored as ECS components.
pub trait Component: 'static + Send + Sync {}

/// Blanket implementation: any `'static + Send + Sync` type is a valid component.
impl<T: 'static + Send + Sync> Component for T {}

/// Type-erased component storage interface.
pub(crate) trait ComponentStorage: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn remove(&mut self, index: u32) -> bool;
}

/// Sparse-set storage for a single component type. O(1) insert/remove/lookup
/// and dense iteration.
pub(crate) struct SparseSet<T> {
    /// Entity index -> dense slot.
    sparse: Vec<Option<usize>>,
    dense: Vec<T>,
    /// Owning entity index of each dense slot.
    owners: Vec<u32>,
}

impl<T: Component> SparseSet<T> {
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
            owners: Vec::new(),
        }
    }

    /// Insert or replace the component of an entity index.
    pub fn insert(&mut self, index: u32, value: T) {
        let slot = index as usize;
        if slot >= self.sparse.len() {
            self.sparse.resize(slot + 1, None);
        }
        match self.sparse[slot] {
            Some(dense_slot) => self.dense[dense_slot] = value,
            None => {
                self.sparse[slot] = Some(self.dense.len());
                self.dense.push(value);
                self.owners.push(index);
            }
        }
    }

    fn dense_slot(&self, index: u32) -> Option<usize> {
        self.sparse.get(index as usize).copied().flatten()
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.dense_slot(index).map(|slot| &self.dense[slot])
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.dense_slot(index).map(move |slot| &mut self.dense[slot])
    }

    /// Iterate over all (entity_index, &component) pairs.
    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.owners.iter().copied().zip(self.dense.iter())
    }

    #[cfg(test)]
    pub fn has(&self, index: u32) -> bool {
        self.dense_slot(index).is_some()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.dense.len()
    }
}

impl<T: Component> ComponentStorage for SparseSet<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn remove(&mut self, index: u32) -> bool {
        let Some(dense_slot) = self.dense_slot(index) else {
            return false;
        };
        self.sparse[index as usize] = None;

        // Swap-remove keeps the dense arrays packed.
        self.dense.swap_remove(dense_slot);
        self.owners.swap_remove(dense_slot);
        if let Some(&moved) = self.owners.get(dense_slot) {
            self.sparse[moved as usize] = Some(dense_slot);
        }
        true
    }
}
