//! Ordered storage behind an observable list.

use crate::engine::SlotStore;
use crate::types::SlotId;

#[derive(Clone, Debug)]
pub(crate) struct Slot<T> {
    pub(crate) id: SlotId,
    pub(crate) item: T,
}

/// Vector of items, each tagged with the slot it was inserted into.
pub(crate) struct ListStore<T> {
    slots: Vec<Slot<T>>,
    next_slot: u64,
}

impl<T: Send + 'static> ListStore<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            next_slot: 1,
        }
    }

    pub(crate) fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        let mut store = Self::new();
        for item in items {
            let at = store.slots.len();
            store.insert(at, item);
        }
        store
    }

    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).map(|slot| &slot.item)
    }

    /// Insert at `index` (which must be <= len).
    pub(crate) fn insert(&mut self, index: usize, item: T) -> SlotId {
        let id = SlotId(self.next_slot);
        self.next_slot += 1;
        self.slots.insert(index, Slot { id, item });
        id
    }

    pub(crate) fn remove(&mut self, index: usize) -> Slot<T> {
        self.slots.remove(index)
    }

    /// Put `item` at `index` under a fresh slot, returning the displaced one.
    pub(crate) fn replace(&mut self, index: usize, item: T) -> (Slot<T>, SlotId) {
        let id = SlotId(self.next_slot);
        self.next_slot += 1;
        let previous = std::mem::replace(&mut self.slots[index], Slot { id, item });
        (previous, id)
    }

    pub(crate) fn move_item(&mut self, from: usize, to: usize) {
        let slot = self.slots.remove(from);
        self.slots.insert(to, slot);
    }

    /// Current position of the item inserted into `id`.
    pub(crate) fn position_of(&self, id: SlotId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.id == id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Slot<T>> {
        self.slots.iter()
    }
}

impl<T: PartialEq + Send + 'static> ListStore<T> {
    pub(crate) fn index_of(&self, item: &T) -> Option<usize> {
        self.slots.iter().position(|slot| slot.item == *item)
    }
}

impl<T: Send + 'static> SlotStore for ListStore<T> {
    fn len(&self) -> usize {
        self.slots.len()
    }

    fn clear(&mut self) {
        self.slots.clear();
    }
}
