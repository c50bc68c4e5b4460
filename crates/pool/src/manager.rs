use crate::handle::{Handle, Slot, SlotIndex};

/// Slot pool with generational handles.
///
/// Values are placed in the lowest empty slot. When every slot is occupied the buffer
/// doubles. Released slots stay where they are (no compaction), so the index of a live
/// value never changes and full scans over `[0, max_index)` stay valid while values are
/// being released. Acquiring during such a scan may grow the buffer and must be deferred
/// by the caller.
#[derive(Debug, Clone)]
pub struct HandleManager<T> {
    slots: Vec<Slot<T>>,
    max_index: usize,
    len: usize,
    /// Every slot below this index is occupied.
    first_free: usize,
}

impl<T> Default for HandleManager<T> {
    fn default() -> Self {
        Self::with_capacity(16)
    }
}

impl<T> HandleManager<T> {
    /// Create a manager with `initial_capacity` empty slots (at least one).
    pub fn with_capacity(initial_capacity: usize) -> Self {
        let capacity = initial_capacity.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, Slot::empty);
        Self {
            slots,
            max_index: 0,
            len: 0,
            first_free: 0,
        }
    }

    /// Store `value` and return its handle.
    pub fn acquire(&mut self, value: T) -> Handle {
        self.acquire_with(|_| value)
    }

    /// Store the value built by `build`, which receives the handle the value will live under.
    pub fn acquire_with(&mut self, build: impl FnOnce(Handle) -> T) -> Handle {
        let index = self.find_free_slot();
        let slot = &mut self.slots[index];
        let handle = Handle {
            index: index as SlotIndex,
            generation: slot.generation,
        };
        slot.value = Some(build(handle));

        self.len += 1;
        self.first_free = index + 1;
        self.max_index = self.max_index.max(index + 1);
        handle
    }

    /// Remove the value behind `handle`. Stale or foreign handles return `None`.
    pub fn release(&mut self, handle: Handle) -> Option<T> {
        let index = handle.index as usize;
        let slot = self.slots.get_mut(index)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);

        self.len -= 1;
        self.first_free = self.first_free.min(index);
        while self.max_index > 0 && !self.slots[self.max_index - 1].is_occupied() {
            self.max_index -= 1;
        }
        Some(value)
    }

    pub fn resolve(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn resolve_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.resolve(handle).is_some()
    }

    /// Handle of the value currently stored at `index`, if any.
    pub fn handle_at(&self, index: usize) -> Option<Handle> {
        let slot = self.slots.get(index)?;
        slot.is_occupied().then_some(Handle {
            index: index as SlotIndex,
            generation: slot.generation,
        })
    }

    pub fn get_at(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(|slot| slot.value.as_ref())
    }

    pub fn get_at_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(|slot| slot.value.as_mut())
    }

    /// One past the highest occupied slot.
    pub fn max_index(&self) -> usize {
        self.max_index
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots currently allocated.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Live values in ascending slot order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.slots[..self.max_index].iter().enumerate(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            inner: self.slots[..self.max_index].iter_mut().enumerate(),
        }
    }

    /// Snapshot of every live handle in ascending slot order.
    pub fn handles(&self) -> Vec<Handle> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    fn find_free_slot(&mut self) -> usize {
        if let Some(offset) = self.slots[self.first_free..]
            .iter()
            .position(|slot| !slot.is_occupied())
        {
            return self.first_free + offset;
        }

        let old_capacity = self.slots.len();
        let new_capacity = old_capacity * 2;
        self.slots.resize_with(new_capacity, Slot::empty);
        tracing::debug!(old_capacity, new_capacity, "handle manager grew");
        old_capacity
    }
}

/// Iterator over `(handle, &value)` pairs, see [`HandleManager::iter`].
pub struct Iter<'a, T> {
    inner: std::iter::Enumerate<std::slice::Iter<'a, Slot<T>>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Handle, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        for (index, slot) in self.inner.by_ref() {
            if let Some(value) = slot.value.as_ref() {
                let handle = Handle {
                    index: index as SlotIndex,
                    generation: slot.generation,
                };
                return Some((handle, value));
            }
        }
        None
    }
}

/// Mutable iterator over `(handle, &mut value)` pairs.
pub struct IterMut<'a, T> {
    inner: std::iter::Enumerate<std::slice::IterMut<'a, Slot<T>>>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = (Handle, &'a mut T);

    fn next(&mut self) -> Option<Self::Item> {
        for (index, slot) in self.inner.by_ref() {
            let generation = slot.generation;
            if let Some(value) = slot.value.as_mut() {
                let handle = Handle {
                    index: index as SlotIndex,
                    generation,
                };
                return Some((handle, value));
            }
        }
        None
    }
}
